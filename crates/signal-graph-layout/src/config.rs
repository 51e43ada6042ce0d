//! Layout configuration.

use serde::{Deserialize, Serialize};

/// How the integration step evolves between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Always integrate with `step_size`.
    #[default]
    Fixed,
    /// Grow or shrink the step from the kinetic-energy trend until
    /// `switch_to_manual_after` substeps have run, then freeze it.
    Adaptive,
}

/// Configuration for the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Integration substeps per `advance` call.
    pub iterations_per_frame: u32,
    /// Integration time step.
    pub step_size: f32,
    /// Pairwise repulsion coefficient.
    pub repulsion_force: f32,
    /// Spring coefficient applied to every link.
    pub spring_tension: f32,
    /// Display only.
    edge_opacity: f32,
    /// Display only.
    node_scale: f32,
    pub step_mode: StepMode,
    /// Substeps after which the adaptive step freezes.
    pub switch_to_manual_after: u32,
    /// Halvings applied to the step when energy rises.
    pub search_iterations: u32,
    /// Lower step bound as a fraction of `step_size` (and upper bound as its inverse).
    pub c1: f32,
    /// Energy ratio under which the step grows.
    pub c2: f32,
    /// Prefer the wgpu backend; falls back to the CPU when no adapter is found.
    pub use_gpu: bool,
    /// Velocity retained per substep, in `[0, 1]`.
    pub damping: f32,
    /// Pull toward a category anchor per unit of distance outside its radius.
    pub anchor_pull: f32,
    /// Distance of freshly placed particles from the origin.
    pub initial_radius: f32,
    pub particle_mass: f32,
    /// Relative spring-tension change applied by one command.
    pub tension_nudge: f32,
    /// Added to squared distances in the repulsion term.
    pub softening: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations_per_frame: 20,
            step_size: 0.02,
            repulsion_force: 1.0,
            spring_tension: 0.1,
            edge_opacity: 0.1,
            node_scale: 1.0,
            step_mode: StepMode::Fixed,
            switch_to_manual_after: 250,
            search_iterations: 1,
            c1: 0.1,
            c2: 0.9,
            use_gpu: true,
            damping: 0.9,
            anchor_pull: 0.05,
            initial_radius: 1000.0,
            particle_mass: 1.0,
            tension_nudge: 0.1,
            softening: 0.01,
        }
    }
}

impl LayoutConfig {
    pub fn edge_opacity(&self) -> f32 {
        self.edge_opacity.clamp(0.0, 1.0)
    }

    /// Clamped to `[0, 1]`.
    pub fn set_edge_opacity(&mut self, value: f32) {
        self.edge_opacity = value.clamp(0.0, 1.0);
    }

    pub fn node_scale(&self) -> f32 {
        self.node_scale.max(0.0)
    }

    /// Clamped to be non-negative.
    pub fn set_node_scale(&mut self, value: f32) {
        self.node_scale = value.max(0.0);
    }

    /// Smallest step the adaptive mode may reach.
    pub fn min_step(&self) -> f32 {
        self.step_size * self.c1_bounded()
    }

    /// Largest step the adaptive mode may reach.
    pub fn max_step(&self) -> f32 {
        self.step_size / self.c1_bounded()
    }

    fn c1_bounded(&self) -> f32 {
        self.c1.clamp(f32::EPSILON, 1.0)
    }

    /// CPU-only copy of this configuration.
    pub fn cpu_only(mut self) -> Self {
        self.use_gpu = false;
        self
    }
}

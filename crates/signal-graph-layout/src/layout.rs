//! High-level layout interface.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use signal_graph_core::{Color, Edge, EdgeId, Node, NodeId, Topology, Vec3};
use tracing::{debug, info, warn};

use crate::backend::{ForceBackend, ForceField};
use crate::config::{LayoutConfig, StepMode};
use crate::cpu::CpuBackend;
use crate::gpu::GpuBackend;
use crate::{Anchor, LayoutError, Link, Particle, Result, SimParams};

/// Current state of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutState {
    /// `advance` integrates.
    Running,
    /// `advance` is a no-op; queries still return the last state.
    Paused,
}

/// External tuning adjustment, consumed at most once per `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// `+1`: stiffen springs.
    Tighten,
    /// `-1`: soften springs.
    Loosen,
}

impl Command {
    /// Map a scalar command; `0` means no command.
    pub fn from_value(value: i32) -> Option<Self> {
        match value.signum() {
            1 => Some(Command::Tighten),
            -1 => Some(Command::Loosen),
            _ => None,
        }
    }

    pub fn value(self) -> i32 {
        match self {
            Command::Tighten => 1,
            Command::Loosen => -1,
        }
    }
}

/// FIFO of pending commands, owned by the caller driving the clock.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    queue: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    /// Queue a scalar command. Zero is ignored.
    pub fn push_value(&mut self, value: i32) {
        if let Some(command) = Command::from_value(value) {
            self.push(command);
        }
    }

    pub fn pop(&mut self) -> Option<Command> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Soft clustering constraint: members are pulled toward `center` once
/// farther than `radius` from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub members: Vec<NodeId>,
    pub center: Vec3,
    pub radius: f32,
}

impl Category {
    pub fn new(members: Vec<NodeId>, center: Vec3, radius: f32) -> Self {
        Self {
            members,
            center,
            radius,
        }
    }

    pub(crate) fn anchor(&self) -> Anchor {
        Anchor {
            center: self.center.into(),
            radius: self.radius,
        }
    }
}

/// Result of one `advance` call.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceReport {
    /// Substeps integrated; zero while paused.
    pub substeps: u32,
    pub step_size: f32,
    pub spring_tension: f32,
    pub kinetic_energy: f32,
    pub backend: &'static str,
    pub command: Option<Command>,
    pub duration: Duration,
}

/// Force-directed layout over the particles and links of one topology.
pub struct LayoutEngine {
    config: LayoutConfig,
    backend: Box<dyn ForceBackend>,
    state: LayoutState,
    particles: Vec<Particle>,
    categories: Vec<Category>,
    field: ForceField,
    /// Current integration step; differs from the config in adaptive mode.
    step_size: f32,
    /// Current spring tension; moved by commands.
    spring_tension: f32,
    substeps_run: u64,
    previous_energy: Option<f32>,
    /// Adaptive step frozen.
    manual: bool,
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("particles", &self.particles.len())
            .field("links", &self.field.links.len())
            .field("categories", &self.categories.len())
            .finish()
    }
}

/// Random unit vector, rejection-sampled from the unit ball.
fn random_direction(rng: &mut impl Rng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.random_range(-1.0f32..=1.0),
            rng.random_range(-1.0f32..=1.0),
            rng.random_range(-1.0f32..=1.0),
        );
        let len_sq = v.length_squared();
        if len_sq > 0.0 && len_sq <= 1.0 {
            return v.normalized();
        }
    }
}

fn links_from(topology: &Topology) -> Result<Vec<Link>> {
    let node_count = topology.node_count();
    topology
        .edges()
        .iter()
        .enumerate()
        .map(|(i, edge)| {
            if edge.end1.0 >= node_count || edge.end2.0 >= node_count {
                return Err(LayoutError::InvalidGraph(format!(
                    "edge {i} ({} -> {}) references a node outside 0..{node_count}",
                    edge.end1, edge.end2
                )));
            }
            Ok(Link {
                par1: edge.end1.0 as u32,
                par2: edge.end2.0 as u32,
                length: edge.length,
                strength: edge.value,
                color: Color::WHITE.to_array(),
            })
        })
        .collect()
}

impl LayoutEngine {
    /// Create an engine, preferring the GPU when `config.use_gpu` is set.
    ///
    /// Without a usable adapter the CPU backend is used instead.
    pub fn new(config: LayoutConfig) -> Self {
        let backend: Box<dyn ForceBackend> = if config.use_gpu {
            match GpuBackend::new_blocking() {
                Ok(gpu) => Box::new(gpu),
                Err(e) => {
                    warn!(error = %e, "gpu_unavailable_using_cpu");
                    Box::new(CpuBackend::new())
                }
            }
        } else {
            Box::new(CpuBackend::new())
        };
        Self::with_backend(config, backend)
    }

    /// Create an engine on an explicit backend.
    pub fn with_backend(config: LayoutConfig, backend: Box<dyn ForceBackend>) -> Self {
        info!(backend = backend.name(), "layout_engine_created");
        Self {
            step_size: config.step_size,
            spring_tension: config.spring_tension,
            config,
            backend,
            state: LayoutState::Paused,
            particles: Vec::new(),
            categories: Vec::new(),
            field: ForceField::default(),
            substeps_run: 0,
            previous_energy: None,
            manual: false,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replace the configuration; step size and spring tension restart from it.
    pub fn set_config(&mut self, config: LayoutConfig) {
        self.step_size = config.step_size;
        self.spring_tension = config.spring_tension;
        self.config = config;
        self.previous_energy = None;
        self.manual = false;
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    pub fn pause(&mut self) {
        self.state = LayoutState::Paused;
    }

    pub fn unpause(&mut self) {
        self.state = LayoutState::Running;
    }

    pub fn is_paused(&self) -> bool {
        self.state == LayoutState::Paused
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn links(&self) -> &[Link] {
        &self.field.links
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.particles.iter().map(Particle::position).collect()
    }

    pub fn step_size(&self) -> f32 {
        self.step_size
    }

    pub fn spring_tension(&self) -> f32 {
        self.spring_tension
    }

    /// Substeps integrated since the last topology install.
    pub fn substeps_run(&self) -> u64 {
        self.substeps_run
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.particles.iter().map(Particle::kinetic_energy).sum()
    }

    fn reindex(&mut self) {
        let links = std::mem::take(&mut self.field.links);
        self.field = ForceField::build(self.particles.len(), links, &self.categories);
    }

    fn restart_adaptive(&mut self) {
        self.step_size = self.config.step_size;
        self.substeps_run = 0;
        self.previous_energy = None;
        self.manual = false;
    }

    /// Place every particle at a random point `initial_radius` from the
    /// origin with zero velocity.
    pub fn reset_state(&mut self, rng: &mut impl Rng) {
        let radius = self.config.initial_radius;
        for particle in &mut self.particles {
            particle.position = (random_direction(rng) * radius).into();
            particle.velocity = [0.0; 3];
            particle.force = [0.0; 3];
        }
        self.restart_adaptive();
    }

    /// Replace particles and links with a new topology at random positions.
    ///
    /// Categories refer to the previous node ids and are dropped.
    pub fn install_topology(&mut self, topology: &Topology, rng: &mut impl Rng) -> Result<()> {
        let links = links_from(topology)?;
        let mass = self.config.particle_mass;
        self.particles = topology
            .nodes()
            .iter()
            .map(|n| Particle::new(Vec3::ZERO, n.size, n.color, mass))
            .collect();
        self.categories.clear();
        self.field.links = links;
        self.reindex();
        self.reset_state(rng);
        info!(
            nodes = self.particles.len(),
            links = self.field.links.len(),
            "layout_topology_installed"
        );
        Ok(())
    }

    /// Replace particles and links, keeping the positions the topology carries.
    ///
    /// Nodes without a position are placed like [`LayoutEngine::reset_state`].
    /// Velocities restart at zero; categories are kept.
    pub fn update_topology(&mut self, topology: &Topology, rng: &mut impl Rng) -> Result<()> {
        let links = links_from(topology)?;
        let mass = self.config.particle_mass;
        let radius = self.config.initial_radius;
        self.particles = topology
            .nodes()
            .iter()
            .map(|n| {
                let position = n
                    .position
                    .unwrap_or_else(|| random_direction(rng) * radius);
                Particle::new(position, n.size, n.color, mass)
            })
            .collect();
        self.field.links = links;
        self.reindex();
        info!(
            nodes = self.particles.len(),
            links = self.field.links.len(),
            "layout_topology_updated"
        );
        Ok(())
    }

    /// Replace only the links from `topology`'s edges. Particle state is untouched.
    ///
    /// Links keep the display color of the link previously at the same index.
    pub fn rebuild_edges(&mut self, topology: &Topology) -> Result<()> {
        if topology.node_count() != self.particles.len() {
            return Err(LayoutError::InvalidGraph(format!(
                "topology has {} nodes, layout has {} particles",
                topology.node_count(),
                self.particles.len()
            )));
        }
        let mut links = links_from(topology)?;
        for (link, old) in links.iter_mut().zip(&self.field.links) {
            link.color = old.color;
        }
        self.field.links = links;
        self.reindex();
        debug!(links = self.field.links.len(), "layout_edges_rebuilt");
        Ok(())
    }

    /// Current simulation as a topology: one placed node per particle, one
    /// untyped edge per link, ids matching particle and link indices.
    pub fn snapshot(&self) -> Topology {
        let mut topology = Topology::new();
        for particle in &self.particles {
            topology.add_node(Node::spatial(
                particle.position(),
                particle.size,
                Color::from_array(particle.color),
            ));
        }
        for link in &self.field.links {
            topology.insert_edge(Edge::new(
                NodeId(link.par1 as usize),
                NodeId(link.par2 as usize),
                link.length,
                link.strength,
            ));
        }
        topology
    }

    /// Snapshot, let `mutate` change the edges, and push them back.
    ///
    /// The exclusive borrow keeps any other rebuild from slipping in between.
    pub fn with_snapshot<T>(&mut self, mutate: impl FnOnce(&mut Topology) -> T) -> Result<T> {
        let mut topology = self.snapshot();
        let out = mutate(&mut topology);
        self.rebuild_edges(&topology)?;
        Ok(out)
    }

    /// Register a clustering constraint. Returns its index.
    pub fn add_category(&mut self, members: Vec<NodeId>, center: Vec3, radius: f32) -> Result<usize> {
        if let Some(bad) = members.iter().find(|m| m.0 >= self.particles.len()) {
            return Err(LayoutError::InvalidGraph(format!(
                "category member {bad} outside 0..{}",
                self.particles.len()
            )));
        }
        if radius.is_nan() || radius < 0.0 {
            return Err(LayoutError::InvalidGraph(format!(
                "category radius must be non-negative, got {radius}"
            )));
        }
        self.categories.push(Category::new(members, center, radius));
        self.reindex();
        debug!(
            category = self.categories.len() - 1,
            radius, "layout_category_added"
        );
        Ok(self.categories.len() - 1)
    }

    pub fn clear_categories(&mut self) {
        self.categories.clear();
        self.reindex();
    }

    /// Set the display color of the given links.
    pub fn paint_edges(&mut self, edges: &[EdgeId], color: Color) -> Result<()> {
        let count = self.field.links.len();
        if let Some(bad) = edges.iter().find(|e| e.0 >= count) {
            return Err(LayoutError::InvalidGraph(format!(
                "edge {bad} outside 0..{count}"
            )));
        }
        for e in edges {
            self.field.links[e.0].color = color.to_array();
        }
        Ok(())
    }

    pub fn paint_all_edges(&mut self, color: Color) {
        for link in &mut self.field.links {
            link.color = color.to_array();
        }
    }

    fn sim_params(&self) -> SimParams {
        SimParams {
            node_count: self.particles.len() as u32,
            link_count: self.field.links.len() as u32,
            dt: self.step_size,
            damping: self.config.damping,
            repulsion: self.config.repulsion_force,
            spring_tension: self.spring_tension,
            anchor_pull: self.config.anchor_pull,
            softening: self.config.softening,
        }
    }

    fn apply_command(&mut self, command: Command) {
        let factor = 1.0 + self.config.tension_nudge;
        match command {
            Command::Tighten => self.spring_tension *= factor,
            Command::Loosen => {
                if factor > 0.0 {
                    self.spring_tension /= factor;
                }
            }
        }
        debug!(
            command = command.value(),
            spring_tension = self.spring_tension,
            "layout_command_applied"
        );
    }

    fn adapt_step(&mut self, energy: f32) {
        if self.config.step_mode != StepMode::Adaptive || self.manual {
            return;
        }
        if let Some(previous) = self.previous_energy {
            if energy < self.config.c2 * previous {
                self.step_size *= 1.1;
            } else if energy > previous {
                self.step_size *= 0.5f32.powi(self.config.search_iterations as i32);
            }
            self.step_size = self
                .step_size
                .clamp(self.config.min_step(), self.config.max_step());
        }
        self.previous_energy = Some(energy);
        if self.substeps_run >= u64::from(self.config.switch_to_manual_after) {
            self.manual = true;
            info!(
                step_size = self.step_size,
                substeps = self.substeps_run,
                "layout_step_frozen"
            );
        }
    }

    /// Consume at most one command, then integrate `iterations_per_frame`
    /// substeps. A no-op while paused.
    pub fn advance(&mut self, commands: &mut CommandQueue) -> Result<AdvanceReport> {
        let started = Instant::now();
        if self.is_paused() {
            return Ok(self.report(0, None, started));
        }

        let command = commands.pop();
        if let Some(command) = command {
            self.apply_command(command);
        }

        let substeps = self.config.iterations_per_frame;
        let params = self.sim_params();
        if let Err(e) =
            self.backend
                .run_substeps(&mut self.particles, &self.field, &params, substeps)
        {
            if self.backend.name() == "cpu" {
                return Err(e);
            }
            warn!(
                error = %e,
                backend = self.backend.name(),
                "layout_backend_failed_using_cpu"
            );
            self.backend = Box::new(CpuBackend::new());
            self.backend
                .run_substeps(&mut self.particles, &self.field, &params, substeps)?;
        }
        self.substeps_run += u64::from(substeps);

        let energy = self.kinetic_energy();
        self.adapt_step(energy);

        let report = self.report(substeps, command, started);
        debug!(
            substeps,
            kinetic_energy = report.kinetic_energy,
            step_size = report.step_size,
            "layout_advance_complete"
        );
        Ok(report)
    }

    fn report(&self, substeps: u32, command: Option<Command>, started: Instant) -> AdvanceReport {
        AdvanceReport {
            substeps,
            step_size: self.step_size,
            spring_tension: self.spring_tension,
            kinetic_energy: self.kinetic_energy(),
            backend: self.backend.name(),
            command,
            duration: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cpu_engine(config: LayoutConfig) -> LayoutEngine {
        LayoutEngine::with_backend(config.cpu_only(), Box::new(CpuBackend::new()))
    }

    fn installed(topology: &Topology) -> LayoutEngine {
        let mut engine = cpu_engine(LayoutConfig::default());
        engine
            .install_topology(topology, &mut StdRng::seed_from_u64(7))
            .unwrap();
        engine
    }

    #[test]
    fn test_install_places_particles_on_sphere() {
        let engine = installed(&Topology::ring(12));
        assert_eq!(engine.particles().len(), 12);
        assert_eq!(engine.links().len(), 12);
        for p in engine.particles() {
            assert!((p.position().length() - 1000.0).abs() < 0.1);
            assert_eq!(p.velocity, [0.0; 3]);
        }
        assert_eq!(engine.state(), LayoutState::Paused);
    }

    #[test]
    fn test_paused_advance_is_noop() {
        let mut engine = installed(&Topology::hub(4));
        let before = engine.positions();
        let mut commands = CommandQueue::new();
        commands.push(Command::Tighten);

        let report = engine.advance(&mut commands).unwrap();

        assert_eq!(report.substeps, 0);
        assert_eq!(engine.positions(), before);
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_advance_moves_and_consumes_one_command() {
        let mut engine = installed(&Topology::string(5));
        engine.unpause();
        let before = engine.positions();
        let mut commands = CommandQueue::new();
        commands.push_value(1);
        commands.push_value(0);
        commands.push_value(-1);
        assert_eq!(commands.len(), 2);

        let report = engine.advance(&mut commands).unwrap();

        assert_eq!(report.substeps, 20);
        assert_eq!(report.command, Some(Command::Tighten));
        assert!((engine.spring_tension() - 0.11).abs() < 1e-6);
        assert_eq!(commands.len(), 1);
        assert_ne!(engine.positions(), before);
        assert_eq!(engine.substeps_run(), 20);

        engine.advance(&mut commands).unwrap();
        assert!((engine.spring_tension() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_rebuild_edges_preserves_particles() {
        let mut engine = installed(&Topology::ring(6));
        engine.unpause();
        engine.advance(&mut CommandQueue::new()).unwrap();
        let particles = engine.particles().to_vec();

        engine.paint_edges(&[EdgeId(1)], Color::RED).unwrap();
        let strengths = engine
            .with_snapshot(|t| {
                t.edge_mut(EdgeId(1)).unwrap().value = 5.0;
                t.edges().iter().map(|e| e.value).collect::<Vec<_>>()
            })
            .unwrap();

        assert_eq!(engine.particles(), particles.as_slice());
        assert_eq!(engine.links()[1].strength, 5.0);
        assert_eq!(engine.links()[1].color, Color::RED.to_array());
        assert_eq!(engine.links()[0].strength, strengths[0]);
    }

    #[test]
    fn test_rebuild_edges_rejects_mismatched_topology() {
        let mut engine = installed(&Topology::ring(6));
        let err = engine.rebuild_edges(&Topology::ring(5)).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidGraph(_)));
    }

    #[test]
    fn test_snapshot_matches_simulation() {
        let engine = installed(&Topology::tree(9, 3).unwrap());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.node_count(), 9);
        assert_eq!(snapshot.edge_count(), 8);
        for (node, particle) in snapshot.nodes().iter().zip(engine.particles()) {
            assert_eq!(node.position, Some(particle.position()));
            assert_eq!(node.size, particle.size);
        }
    }

    #[test]
    fn test_update_topology_keeps_given_positions() {
        let mut engine = installed(&Topology::string(3));
        let mut t = engine.snapshot();
        t.node_mut(NodeId(1)).unwrap().position = Some(Vec3::new(1.0, 2.0, 3.0));
        engine
            .update_topology(&t, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(engine.particles()[1].position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_category_validation() {
        let mut engine = installed(&Topology::hub(3));
        assert_eq!(
            engine
                .add_category(vec![NodeId(0), NodeId(1)], Vec3::ZERO, 100.0)
                .unwrap(),
            0
        );
        assert!(engine
            .add_category(vec![NodeId(4)], Vec3::ZERO, 1.0)
            .is_err());
        assert!(engine
            .add_category(vec![NodeId(1)], Vec3::ZERO, -1.0)
            .is_err());
        assert_eq!(engine.categories().len(), 1);
    }

    #[test]
    fn test_category_pulls_members_inward() {
        let mut config = LayoutConfig::default();
        config.repulsion_force = 0.0;
        config.anchor_pull = 1.0;
        let mut engine = cpu_engine(config);
        let mut t = Topology::new();
        t.add_node(Node::new());
        engine
            .install_topology(&t, &mut StdRng::seed_from_u64(3))
            .unwrap();
        engine.add_category(vec![NodeId(0)], Vec3::ZERO, 100.0).unwrap();
        engine.unpause();
        for _ in 0..50 {
            engine.advance(&mut CommandQueue::new()).unwrap();
        }
        assert!(engine.particles()[0].position().length() < 1000.0);
    }

    #[test]
    fn test_adaptive_step_stays_bounded_and_freezes() {
        let mut config = LayoutConfig::default();
        config.step_mode = StepMode::Adaptive;
        config.switch_to_manual_after = 60;
        let mut engine = cpu_engine(config.clone());
        engine
            .install_topology(&Topology::ring(8), &mut StdRng::seed_from_u64(5))
            .unwrap();
        engine.unpause();
        let mut commands = CommandQueue::new();
        for _ in 0..3 {
            engine.advance(&mut commands).unwrap();
            assert!(engine.step_size() >= config.min_step() - 1e-9);
            assert!(engine.step_size() <= config.max_step() + 1e-9);
        }
        let frozen = engine.step_size();
        for _ in 0..5 {
            engine.advance(&mut commands).unwrap();
        }
        assert_eq!(engine.step_size(), frozen);
    }

    #[test]
    fn test_fixed_step_never_changes() {
        let mut engine = installed(&Topology::ring(5));
        engine.unpause();
        for _ in 0..4 {
            engine.advance(&mut CommandQueue::new()).unwrap();
        }
        assert_eq!(engine.step_size(), 0.02);
    }
}

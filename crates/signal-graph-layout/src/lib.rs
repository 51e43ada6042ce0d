//! Force-directed 3D layout for signaling networks.
//!
//! The engine keeps one [`Particle`] per topology node and one [`Link`] per
//! edge, and advances them with a small number of integration substeps per
//! frame. Each substep is split into two phases so that every force read
//! happens before any position is written:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     accumulate (per node)                   │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  Repulsion  │───▶│   Anchor    │───▶│   Springs   │      │
//! │  │ (all pairs) │    │ (categories)│    │  (links)    │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     integrate (per node)                    │
//! │  semi-implicit Euler, damping, force accumulator reset      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two interchangeable [`ForceBackend`]s implement the substep: a wgpu
//! compute backend and a rayon backend. Both evaluate the same expressions
//! in the same order and agree up to floating-point tolerance.

mod backend;
mod config;
mod cpu;
mod error;
mod gpu;
mod layout;
mod shaders;

pub use backend::{ForceBackend, ForceField};
pub use config::{LayoutConfig, StepMode};
pub use cpu::CpuBackend;
pub use error::LayoutError;
pub use gpu::GpuBackend;
pub use layout::{AdvanceReport, Category, Command, CommandQueue, LayoutEngine, LayoutState};

use signal_graph_core::{Color, Vec3};

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Simulation state of one node. Shared verbatim with the GPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Particle {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    /// Force accumulated during the current substep.
    pub force: [f32; 3],
    pub mass: f32,
    pub charge: f32,
    /// Display size.
    pub size: f32,
    /// Display color.
    pub color: [f32; 4],
}

impl Particle {
    pub fn new(position: Vec3, size: f32, color: Color, mass: f32) -> Self {
        Self {
            position: position.into(),
            mass,
            charge: 1.0,
            size,
            color: color.to_array(),
            ..Self::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position.into()
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity.into()
    }

    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.velocity().length_squared()
    }
}

/// Simulation state of one edge. Shared verbatim with the GPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Link {
    pub par1: u32,
    pub par2: u32,
    /// Rest length.
    pub length: f32,
    pub strength: f32,
    /// Display color.
    pub color: [f32; 4],
}

/// Where a node's links and categories start in the flattened index lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct NodeSpan {
    pub link_start: u32,
    pub link_count: u32,
    pub category_start: u32,
    pub category_count: u32,
}

/// GPU form of a category constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Anchor {
    pub center: [f32; 3],
    pub radius: f32,
}

/// Per-substep parameters, uploaded as a uniform.
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SimParams {
    pub node_count: u32,
    pub link_count: u32,
    pub dt: f32,
    pub damping: f32,
    pub repulsion: f32,
    pub spring_tension: f32,
    pub anchor_pull: f32,
    pub softening: f32,
}

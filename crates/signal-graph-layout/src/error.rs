//! Error types for layout operations.

use signal_graph_core::TopologyError;
use thiserror::Error;

/// Errors that can occur during layout operations.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Failed to initialize GPU device.
    #[error("GPU initialization failed: {0}")]
    GpuInit(String),

    /// Failed to create GPU resources.
    #[error("GPU resource creation failed: {0}")]
    ResourceCreation(String),

    /// Failed to execute GPU compute.
    #[error("GPU compute execution failed: {0}")]
    Compute(String),

    /// Failed to read back data from GPU.
    #[error("GPU readback failed: {0}")]
    Readback(String),

    /// Topology or category data inconsistent with the simulation.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Error from the topology layer.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

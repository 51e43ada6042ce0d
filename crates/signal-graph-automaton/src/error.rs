//! Error types for propagation.

use signal_graph_core::TopologyError;
use signal_graph_layout::LayoutError;
use thiserror::Error;

/// Result type alias for propagation operations.
pub type Result<T> = std::result::Result<T, PropagationError>;

/// Errors that can occur while driving the automaton.
#[derive(Debug, Error)]
pub enum PropagationError {
    /// Name lookup or network mutation failed.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Pushing strengths into the layout failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The layout was installed from a different topology.
    #[error("layout holds {links} links but the network has {edges} edges")]
    OutOfSync { links: usize, edges: usize },
}

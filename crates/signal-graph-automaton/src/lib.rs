//! Discrete signal propagation over a typed interaction network.
//!
//! A [`PropagationAutomaton`] owns a [`SignalNetwork`] and advances its
//! Active/Blocked node state by exactly one generation per
//! [`PropagationAutomaton::propagate`] call. Repetition is the caller's job:
//! the orchestrator invokes it on a fixed interval.
//!
//! ## Tick Structure
//!
//! ```text
//! seed inputs ─▶ decouple idle bindings ─▶ highlight ─▶ walk active nodes
//!                                                            │
//!        push strengths via snapshot/rebuild ◀─ commit ◀─────┘
//! ```
//!
//! Every read in a tick sees the state at the start of the tick; the commit
//! phase alone writes node flags. Binding-edge strength changes are batched
//! and reach the layout through [`LayoutEngine::with_snapshot`], so particle
//! positions are never disturbed.
//!
//! An older generation driven by per-node [`SignalKind`]s is kept as
//! [`PropagationAutomaton::propagate_signal_kinds`].
//!
//! [`SignalNetwork`]: signal_graph_core::SignalNetwork
//! [`SignalKind`]: signal_graph_core::SignalKind
//! [`LayoutEngine::with_snapshot`]: signal_graph_layout::LayoutEngine::with_snapshot

mod automaton;
mod config;
mod error;
mod kinds;

pub use automaton::{PropagationAutomaton, PropagationReport};
pub use config::PropagationConfig;
pub use error::{PropagationError, Result};

/// Highlight set names used in reports.
pub mod highlight {
    pub const ACTIVE: &str = "active";
    pub const BLOCKED: &str = "blocked";
    pub const POSITIVE: &str = "positive";
    pub const NEGATIVE: &str = "negative";
    pub const END: &str = "end";
    /// Edges that carried an activating signal this tick.
    pub const EXCITED: &str = "excited";
    /// Edges that carried a blocking signal this tick.
    pub const INHIBITED: &str = "inhibited";
}

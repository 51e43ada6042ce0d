//! CLI command implementations.

pub mod centrality;
pub mod generate;
pub mod run;

use signal_graph_core::Topology;
use signal_graph_layout::LayoutEngine;

/// Copy the engine's current positions onto `topology`'s nodes.
pub(crate) fn store_positions(layout: &LayoutEngine, topology: &mut Topology) {
    for (node, position) in topology.nodes_mut().zip(layout.positions()) {
        node.position = Some(position);
    }
}

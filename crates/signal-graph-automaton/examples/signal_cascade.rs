//! Drive a small signaling cascade alongside its layout.
//!
//! Run with:
//! ```bash
//! cargo run --example signal_cascade -p signal-graph-automaton
//! ```

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_graph_automaton::PropagationAutomaton;
use signal_graph_core::{Color, InteractionType, SignalNetwork};
use signal_graph_layout::{CommandQueue, LayoutConfig, LayoutEngine};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut network = SignalNetwork::new();
    for name in ["Wnt", "FZD", "DVL", "GSK3", "bCAT", "TCF"] {
        network.add_node(name, Color::WHITE)?;
    }
    network.add_interaction("Wnt", "FZD", InteractionType::Excitatory)?;
    network.add_interaction("FZD", "DVL", InteractionType::Excitatory)?;
    network.add_interaction("DVL", "GSK3", InteractionType::Inhibitory)?;
    network.add_interaction("GSK3", "bCAT", InteractionType::Inhibitory)?;
    network.add_interaction("bCAT", "TCF", InteractionType::Binding)?;

    let mut layout = LayoutEngine::new(LayoutConfig::default());
    layout.install_topology(network.topology(), &mut StdRng::seed_from_u64(7))?;
    layout.unpause();

    let mut automaton = PropagationAutomaton::new(network);
    automaton.add_input("Wnt")?;

    let mut commands = CommandQueue::new();
    for _ in 0..6 {
        for _ in 0..10 {
            layout.advance(&mut commands)?;
        }
        let report = automaton.propagate(&mut layout, Duration::from_millis(500))?;
        let active: Vec<&str> = report
            .next_active
            .iter()
            .filter_map(|&id| automaton.network().name_of(id))
            .collect();
        let blocked: Vec<&str> = report
            .next_blocked
            .iter()
            .filter_map(|&id| automaton.network().name_of(id))
            .collect();
        println!(
            "tick {}: active {:?}, blocked {:?}, pulses {}",
            report.tick,
            active,
            blocked,
            report.pulses.len()
        );
    }
    Ok(())
}

//! Lay out a binary tree and report how the energy settles.
//!
//! Run with: cargo run -p signal-graph-layout --example simple_layout

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_graph_core::Topology;
use signal_graph_layout::{CommandQueue, LayoutConfig, LayoutEngine};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let topology = Topology::binary_tree(255);
    println!(
        "Laying out a binary tree with {} nodes and {} edges...",
        topology.node_count(),
        topology.edge_count()
    );

    let mut engine = LayoutEngine::new(LayoutConfig::default());
    engine.install_topology(&topology, &mut StdRng::seed_from_u64(42))?;
    engine.unpause();
    println!("Backend: {}", engine.backend_name());

    let mut commands = CommandQueue::new();
    let frames = 100;
    let start = Instant::now();

    for frame in 0..frames {
        let report = engine.advance(&mut commands)?;
        if frame % 10 == 0 {
            let extent = engine
                .positions()
                .iter()
                .map(|p| p.length())
                .fold(0.0f32, f32::max);
            println!(
                "Frame {frame}: energy = {:.3}, extent = {extent:.1}",
                report.kinetic_energy
            );
        }
    }

    let elapsed = start.elapsed();
    let fps = frames as f64 / elapsed.as_secs_f64();
    println!("\nCompleted {frames} frames in {elapsed:.2?} ({fps:.1} frames/sec)");

    println!("\nFinal positions (first 5 nodes):");
    for (i, p) in engine.positions().iter().take(5).enumerate() {
        println!("  Node {i}: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
    }
    Ok(())
}

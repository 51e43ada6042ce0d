//! The `generate` command.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_graph_core::Topology;
use signal_graph_layout::{CommandQueue, LayoutEngine};
use tracing::info;

use crate::commands::store_positions;
use crate::config::RunConfig;

/// Generated topology shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    /// One root with `nodes - 1` leaves.
    Hub,
    /// A path.
    String,
    /// A closed path.
    Ring,
    /// Breadth-first tree with `arity` children per parent.
    Tree,
    /// Tree with arity 2.
    BinaryTree,
}

impl Shape {
    pub fn build(self, nodes: usize, arity: usize) -> Result<Topology> {
        let topology = match self {
            Shape::Hub => Topology::hub(nodes.saturating_sub(1)),
            Shape::String => Topology::string(nodes),
            Shape::Ring => Topology::ring(nodes),
            Shape::Tree => Topology::tree(nodes, arity)
                .ok_or_else(|| anyhow!("a tree of {nodes} nodes needs an arity of at least 1"))?,
            Shape::BinaryTree => Topology::binary_tree(nodes),
        };
        Ok(topology)
    }
}

/// Arguments for `sgv generate`.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub shape: Shape,
    pub nodes: usize,
    pub arity: usize,
    pub frames: u32,
    pub seed: u64,
    pub output: PathBuf,
    pub quiet: bool,
}

/// Execute `sgv generate`.
pub fn execute(config: &RunConfig, args: GenerateArgs) -> Result<()> {
    let mut topology = args.shape.build(args.nodes, args.arity)?;
    if !args.quiet {
        println!(
            "🌱 Generated {:?}: {} nodes, {} edges",
            args.shape,
            topology.node_count(),
            topology.edge_count()
        );
    }

    let mut layout = LayoutEngine::new(config.layout.clone());
    layout.install_topology(&topology, &mut StdRng::seed_from_u64(args.seed))?;
    layout.unpause();

    let mut commands = CommandQueue::new();
    let mut energy = 0.0;
    for _ in 0..args.frames {
        energy = layout.advance(&mut commands)?.kinetic_energy;
    }
    layout.pause();
    info!(frames = args.frames, energy, "generate_relaxed");

    store_positions(&layout, &mut topology);
    topology
        .write_to_file(&args.output)
        .with_context(|| format!("Failed to write layout to {}", args.output.display()))?;

    if !args.quiet {
        println!("✅ Relaxed over {} frames, energy {energy:.3}", args.frames);
        println!("💾 Saved to: {}", args.output.display());
    }
    Ok(())
}

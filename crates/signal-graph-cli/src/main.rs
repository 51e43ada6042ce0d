//! sgv - headless driver for signaling-network layout and propagation.
//!
//! Owns the tick clock: advances the layout every frame, runs one
//! propagation generation per interval and writes the settled layout.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::generate::Shape;
use config::RunConfig;

/// sgv - lay out and animate signaling networks.
#[derive(Parser, Debug)]
#[command(
    name = "sgv",
    author,
    version,
    about = "Signaling graph viewer: force-directed layout and signal propagation",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// JSON run configuration. Falls back to $SIGNAL_GRAPH_CONFIG.
    #[arg(short, long, global = true, env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a network, relax its layout and run propagation ticks.
    Run {
        /// Interaction table (name, id, otherId, type, cat1, cat2, cat3).
        #[arg(short, long)]
        network: PathBuf,

        /// Saved layout whose node positions are applied after loading.
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Propagation ticks to run.
        #[arg(short, long, default_value_t = 10)]
        ticks: u64,

        /// Seed for the initial placement.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Simulated frame length in milliseconds.
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,

        /// Extra input names, added to those in the config.
        #[arg(short, long)]
        input: Vec<String>,

        /// Spring commands queued before the first frame (+1 tighten, -1 loosen).
        #[arg(long, allow_negative_numbers = true)]
        nudge: Vec<i32>,

        /// Run the older signal-kind propagation instead.
        #[arg(long)]
        signal_kinds: bool,

        /// Where to write the final layout.
        #[arg(short, long, default_value = "layout.txt")]
        output: PathBuf,
    },

    /// Build a generated topology, relax it and write its layout.
    Generate {
        /// Topology shape.
        #[arg(value_enum)]
        shape: Shape,

        /// Node count.
        #[arg(short, long, default_value_t = 32)]
        nodes: usize,

        /// Children per parent for trees.
        #[arg(short, long, default_value_t = 3)]
        arity: usize,

        /// Layout frames to run.
        #[arg(short, long, default_value_t = 200)]
        frames: u32,

        /// Seed for the initial placement.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Where to write the layout.
        #[arg(short, long, default_value = "layout.txt")]
        output: PathBuf,
    },

    /// Print closeness centrality for every named node.
    Centrality {
        /// Interaction table.
        #[arg(short, long)]
        network: PathBuf,

        /// Only show the most central nodes.
        #[arg(short, long)]
        top: Option<usize>,
    },
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .init();

    let config = RunConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            network,
            layout,
            ticks,
            seed,
            frame_ms,
            input,
            nudge,
            signal_kinds,
            output,
        } => commands::run::execute(
            &config,
            commands::run::RunArgs {
                network,
                layout,
                ticks,
                seed,
                frame_ms,
                inputs: input,
                nudges: nudge,
                signal_kinds,
                output,
                quiet: cli.quiet,
            },
        ),

        Commands::Generate {
            shape,
            nodes,
            arity,
            frames,
            seed,
            output,
        } => commands::generate::execute(
            &config,
            commands::generate::GenerateArgs {
                shape,
                nodes,
                arity,
                frames,
                seed,
                output,
                quiet: cli.quiet,
            },
        ),

        Commands::Centrality { network, top } => commands::centrality::execute(&network, top),
    }
}

//! The `run` command: one network, one clock, layout and propagation in step.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_graph_automaton::{PropagationAutomaton, PropagationReport};
use signal_graph_core::{Color, PulseTrack, SignalNetwork};
use signal_graph_layout::{CommandQueue, LayoutEngine};
use tracing::{debug, info};

use crate::commands::store_positions;
use crate::config::RunConfig;

/// Arguments for `sgv run`.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub network: PathBuf,
    pub layout: Option<PathBuf>,
    pub ticks: u64,
    pub seed: u64,
    pub frame_ms: u64,
    pub inputs: Vec<String>,
    pub nudges: Vec<i32>,
    pub signal_kinds: bool,
    pub output: PathBuf,
    pub quiet: bool,
}

/// Fixed-step clock deciding which frames also run a propagation tick.
#[derive(Debug)]
struct TickClock {
    frame: Duration,
    interval: Duration,
    since_tick: Duration,
}

impl TickClock {
    fn new(frame: Duration, interval: Duration) -> Self {
        Self {
            frame,
            interval,
            since_tick: Duration::ZERO,
        }
    }

    /// Advance one frame. Returns whether a propagation tick is due.
    fn frame(&mut self) -> bool {
        self.since_tick += self.frame;
        if self.since_tick >= self.interval {
            self.since_tick -= self.interval;
            true
        } else {
            false
        }
    }
}

/// Execute `sgv run`.
pub fn execute(config: &RunConfig, args: RunArgs) -> Result<()> {
    if args.frame_ms == 0 {
        bail!("--frame-ms must be at least 1");
    }

    let network = SignalNetwork::from_table_file(&args.network)
        .with_context(|| format!("Failed to load network from {}", args.network.display()))?;
    if !args.quiet {
        println!(
            "📊 Network: {} nodes, {} interactions",
            network.topology().node_count(),
            network.topology().edge_count()
        );
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut layout = LayoutEngine::new(config.layout.clone());
    layout.install_topology(network.topology(), &mut rng)?;
    config.apply_categories(&network, &mut layout)?;

    if let Some(path) = &args.layout {
        let mut placed = network.topology().clone();
        let count = placed
            .read_layout_from_file(path)
            .with_context(|| format!("Failed to read layout from {}", path.display()))?;
        layout.update_topology(&placed, &mut rng)?;
        if !args.quiet {
            println!("📍 Applied {count} saved positions from {}", path.display());
        }
    }

    let mut automaton = PropagationAutomaton::with_config(network, config.propagation.clone());
    for name in config.inputs.iter().chain(&args.inputs) {
        automaton
            .add_input(name)
            .with_context(|| format!("Unknown input {name:?}"))?;
    }

    let mut commands = CommandQueue::new();
    for &value in &args.nudges {
        commands.push_value(value);
    }

    let interval = config.propagation_interval();
    let frame = Duration::from_millis(args.frame_ms);
    let mut clock = TickClock::new(frame, interval);
    let mut pulses = PulseTrack::new();

    if !args.quiet {
        println!(
            "🚀 Running {} ticks on the {} backend ({} ms interval)",
            args.ticks,
            layout.backend_name(),
            interval.as_millis()
        );
    }
    info!(
        ticks = args.ticks,
        inputs = automaton.inputs().count(),
        backend = layout.backend_name(),
        "run_start"
    );

    layout.unpause();
    let mut ticks_run = 0;
    let mut frames = 0u64;
    let mut energy = 0.0;
    while ticks_run < args.ticks {
        energy = layout.advance(&mut commands)?.kinetic_energy;
        frames += 1;
        pulses.advance(frame);
        if !clock.frame() {
            continue;
        }

        let report = if args.signal_kinds {
            automaton.propagate_signal_kinds(&mut layout, interval)?
        } else {
            automaton.propagate(&mut layout, interval)?
        };
        paint_fired_edges(&mut layout, &report)?;
        pulses.extend(report.pulses.iter().cloned());
        ticks_run += 1;

        if !args.quiet {
            println!(
                "⚡ Tick {}: {} active, {} blocked, {} pulses in flight, energy {:.3}",
                report.tick,
                report.next_active.len(),
                report.next_blocked.len(),
                pulses.len(),
                energy
            );
        }
    }
    layout.pause();
    debug!(frames, "run_frames_complete");

    let mut topology = automaton.network().topology().clone();
    store_positions(&layout, &mut topology);
    topology
        .write_to_file(&args.output)
        .with_context(|| format!("Failed to write layout to {}", args.output.display()))?;

    if !args.quiet {
        println!("✅ Run complete: {ticks_run} ticks over {frames} frames, energy {energy:.3}");
        println!("💾 Saved to: {}", args.output.display());
    }
    Ok(())
}

/// Color the edges fired this tick; everything else goes back to white.
fn paint_fired_edges(layout: &mut LayoutEngine, report: &PropagationReport) -> Result<()> {
    layout.paint_all_edges(Color::WHITE);
    for highlight in &report.highlights {
        layout.paint_edges(&highlight.edges, highlight.color)?;
    }
    Ok(())
}

//! Signal-kind propagation.
//!
//! Nodes carrying `Plus` or `Minus` forward it along their outgoing edges;
//! an inhibitory edge flips the polarity for that edge and every later edge
//! of the same node. `End` nodes absorb signals and keep their kind.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use signal_graph_core::{Highlight, InteractionType, NodeId, PulseEvent, SignalKind};
use signal_graph_layout::LayoutEngine;
use tracing::{debug, info};

use crate::automaton::{
    split_schedule, BindingChange, PropagationAutomaton, PropagationReport, Schedule,
};
use crate::error::Result;
use crate::highlight;

impl PropagationAutomaton {
    /// Set the signal kind carried by `name`.
    pub fn set_signal_kind(&mut self, name: &str, kind: SignalKind) -> Result<NodeId> {
        let id = self.network.id_by_name(name)?;
        if let Some(signal) = self.signal_mut(id) {
            signal.kind = kind;
        }
        Ok(id)
    }

    /// Run one signal-kind generation.
    ///
    /// Inputs without a kind start carrying `Plus`. Kinds are read as they
    /// were at the start of the tick; every node except `End` nodes then
    /// drops its kind and takes the one forwarded to it, if any. `Plus`
    /// activates the receiver, `Minus` deactivates it.
    pub fn propagate_signal_kinds(
        &mut self,
        layout: &mut LayoutEngine,
        tick_duration: Duration,
    ) -> Result<PropagationReport> {
        let started = Instant::now();
        let tick = self.tick;

        let inputs: Vec<NodeId> = self.inputs.iter().copied().collect();
        for id in inputs {
            if let Some(signal) = self.signal_mut(id) {
                if signal.kind == SignalKind::None {
                    signal.kind = SignalKind::Plus;
                }
            }
        }

        let config = &self.config;
        let topology = self.network.topology();
        let kinds: Vec<SignalKind> = topology.nodes().iter().map(|n| n.signal_kind()).collect();
        let kind_of = |id: NodeId| kinds.get(id.0).copied().unwrap_or_default();

        let mut schedule = Schedule::new();
        let mut forwarded: Vec<(NodeId, SignalKind)> = Vec::new();
        let mut pulses = Vec::new();
        let mut ends = Vec::new();
        let mut excited = Vec::new();
        let mut inhibited = Vec::new();

        for (i, &kind) in kinds.iter().enumerate() {
            let node = NodeId(i);
            if kind == SignalKind::None {
                continue;
            }

            // A signalled partner releases its binding.
            for e in topology.incoming_edges(node)? {
                let Some(edge) = topology.edge(e) else {
                    continue;
                };
                if edge.kind == Some(InteractionType::Binding) && kind_of(edge.end1).is_polar() {
                    for pair in topology.edge_indices(node, edge.end1) {
                        schedule.insert(pair, BindingChange::Decouple);
                    }
                }
            }

            if kind == SignalKind::End {
                ends.push(node);
                continue;
            }

            let mut signal = kind;
            for e in topology.outgoing_edges(node)? {
                let Some(edge) = topology.edge(e) else {
                    continue;
                };
                match edge.kind {
                    Some(InteractionType::Inhibitory) => signal = signal.flipped(),
                    Some(InteractionType::Binding) => {
                        for pair in topology.edge_indices(node, edge.end2) {
                            schedule.insert(pair, BindingChange::Couple);
                        }
                    }
                    _ => {}
                }
                let color = match signal {
                    SignalKind::Plus => {
                        excited.push(e);
                        Some(config.positive_color)
                    }
                    SignalKind::Minus => {
                        inhibited.push(e);
                        Some(config.negative_color)
                    }
                    _ => None,
                };
                if let Some(color) = color {
                    pulses.push(PulseEvent::new(node, edge.end2, tick_duration, color));
                }
                if kind_of(edge.end2) != SignalKind::End {
                    forwarded.push((edge.end2, signal));
                }
            }
        }

        let end_color = config.end_color;
        let positive_color = config.positive_color;
        let negative_color = config.negative_color;

        for node in self.network.topology_mut().nodes_mut() {
            if let Some(signal) = node.signal.as_mut() {
                if signal.kind != SignalKind::End {
                    signal.kind = SignalKind::None;
                }
            }
        }

        let mut positive = BTreeSet::new();
        let mut negative = BTreeSet::new();
        for &(id, kind) in &forwarded {
            let Some(signal) = self.signal_mut(id) else {
                continue;
            };
            signal.kind = kind;
            match kind {
                SignalKind::Plus => {
                    signal.activate();
                    negative.remove(&id);
                    positive.insert(id);
                }
                SignalKind::Minus => {
                    signal.deactivate();
                    positive.remove(&id);
                    negative.insert(id);
                }
                _ => {}
            }
        }

        let (coupled, decoupled) = split_schedule(&schedule);
        self.push_strengths(layout, &schedule)?;
        self.tick += 1;

        let next_active: Vec<NodeId> = positive.iter().copied().collect();
        let report = PropagationReport {
            tick,
            highlights: vec![
                Highlight::nodes(highlight::END, end_color, ends),
                Highlight::nodes(highlight::POSITIVE, positive_color, next_active.clone()),
                Highlight::nodes(
                    highlight::NEGATIVE,
                    negative_color,
                    negative.into_iter().collect(),
                ),
                Highlight::edges(highlight::EXCITED, positive_color, excited),
                Highlight::edges(highlight::INHIBITED, negative_color, inhibited),
            ],
            pulses,
            coupled,
            decoupled,
            next_active,
            next_blocked: Vec::new(),
            duration: started.elapsed(),
        };
        debug!(forwarded = forwarded.len(), "signal_kinds_forwarded");
        info!(
            tick,
            pulses = report.pulses.len(),
            coupled = report.coupled.len(),
            decoupled = report.decoupled.len(),
            "signal_kind_tick_complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use signal_graph_core::{Color, SignalNetwork};
    use signal_graph_layout::{CpuBackend, LayoutConfig};

    fn setup(network: SignalNetwork) -> (PropagationAutomaton, LayoutEngine) {
        let mut layout = LayoutEngine::with_backend(
            LayoutConfig::default().cpu_only(),
            Box::new(CpuBackend::new()),
        );
        layout
            .install_topology(network.topology(), &mut StdRng::seed_from_u64(2))
            .unwrap();
        (PropagationAutomaton::new(network), layout)
    }

    fn kind(automaton: &PropagationAutomaton, name: &str) -> SignalKind {
        automaton.network().node(name).unwrap().signal_kind()
    }

    #[test]
    fn test_inhibitory_edge_flips_following_edges() {
        let mut network = SignalNetwork::new();
        for name in ["A", "B", "C"] {
            network.add_node(name, Color::WHITE).unwrap();
        }
        network
            .add_interaction("A", "B", InteractionType::Inhibitory)
            .unwrap();
        network
            .add_interaction("A", "C", InteractionType::Excitatory)
            .unwrap();
        let (mut automaton, mut layout) = setup(network);
        automaton.add_input("A").unwrap();

        let report = automaton
            .propagate_signal_kinds(&mut layout, Duration::from_millis(100))
            .unwrap();

        assert_eq!(kind(&automaton, "A"), SignalKind::None);
        assert_eq!(kind(&automaton, "B"), SignalKind::Minus);
        assert_eq!(kind(&automaton, "C"), SignalKind::Minus);
        assert_eq!(report.pulses.len(), 2);
        assert!(report.pulses.iter().all(|p| p.color == Color::RED));
        let inhibited = report
            .highlights
            .iter()
            .find(|h| h.name == highlight::INHIBITED)
            .unwrap();
        assert_eq!(inhibited.edges.len(), 2);
        assert!(inhibited.nodes.is_empty());
    }

    #[test]
    fn test_end_node_absorbs_and_keeps_kind() {
        let mut network = SignalNetwork::new();
        for name in ["A", "Z"] {
            network.add_node(name, Color::WHITE).unwrap();
        }
        network
            .add_interaction("A", "Z", InteractionType::Excitatory)
            .unwrap();
        let (mut automaton, mut layout) = setup(network);
        automaton.set_signal_kind("A", SignalKind::Plus).unwrap();
        automaton.set_signal_kind("Z", SignalKind::End).unwrap();

        let report = automaton
            .propagate_signal_kinds(&mut layout, Duration::from_millis(100))
            .unwrap();

        assert_eq!(kind(&automaton, "Z"), SignalKind::End);
        assert!(!automaton.is_active("Z").unwrap());
        let end = &report.highlights[0];
        assert_eq!(end.nodes, vec![NodeId(1)]);
        assert_eq!(end.color, Color::WHITE);
    }

    #[test]
    fn test_binding_couples_then_decouples() {
        let mut network = SignalNetwork::new();
        for name in ["A", "B"] {
            network.add_node(name, Color::WHITE).unwrap();
        }
        let e = network
            .add_interaction("A", "B", InteractionType::Binding)
            .unwrap();
        network.topology_mut().edge_mut(e).unwrap().value = 0.5;
        let (mut automaton, mut layout) = setup(network);
        automaton.set_signal_kind("A", SignalKind::Plus).unwrap();

        let first = automaton
            .propagate_signal_kinds(&mut layout, Duration::from_millis(100))
            .unwrap();
        assert_eq!(first.coupled, vec![e]);
        assert_eq!(layout.links()[e.0].strength, 5.0);
        assert_eq!(kind(&automaton, "B"), SignalKind::Plus);

        // A couples again on the way out, then B sees a polar partner and
        // releases; the later node wins.
        automaton.set_signal_kind("A", SignalKind::Minus).unwrap();
        let second = automaton
            .propagate_signal_kinds(&mut layout, Duration::from_millis(100))
            .unwrap();
        assert_eq!(second.decoupled, vec![e]);
        assert_eq!(layout.links()[e.0].strength, 0.5);
    }
}

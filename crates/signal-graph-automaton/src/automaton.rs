//! The Active/Blocked propagation automaton.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use signal_graph_core::{
    EdgeId, Highlight, InteractionType, NodeId, PulseEvent, SignalNetwork, SignalState,
};
use signal_graph_layout::LayoutEngine;
use tracing::{debug, info};

use crate::config::PropagationConfig;
use crate::error::{PropagationError, Result};
use crate::highlight;

/// Result of a single propagation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationReport {
    /// Tick number (0-indexed).
    pub tick: u64,
    /// Named node sets to highlight until the next tick.
    pub highlights: Vec<Highlight>,
    /// Pulses to animate along the walked edges.
    pub pulses: Vec<PulseEvent>,
    /// Binding edges set to the couple strength.
    pub coupled: Vec<EdgeId>,
    /// Binding edges set to the decouple strength.
    pub decoupled: Vec<EdgeId>,
    /// Nodes recorded active for the next tick.
    pub next_active: Vec<NodeId>,
    /// Nodes recorded blocked for the next tick.
    pub next_blocked: Vec<NodeId>,
    pub duration: Duration,
}

impl PropagationReport {
    /// Check if the tick changed any binding strength.
    pub fn changed_strengths(&self) -> bool {
        !self.coupled.is_empty() || !self.decoupled.is_empty()
    }
}

/// Strength change scheduled for one binding edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingChange {
    Couple,
    Decouple,
}

impl BindingChange {
    fn strength(self, config: &PropagationConfig) -> f32 {
        match self {
            Self::Couple => config.couple_strength,
            Self::Decouple => config.decouple_strength,
        }
    }
}

/// Binding changes of one tick; later entries for an edge win.
pub(crate) type Schedule = BTreeMap<EdgeId, BindingChange>;

/// Coupled and decoupled edge ids, in edge order.
pub(crate) fn split_schedule(schedule: &Schedule) -> (Vec<EdgeId>, Vec<EdgeId>) {
    let mut coupled = Vec::new();
    let mut decoupled = Vec::new();
    for (&e, &change) in schedule {
        match change {
            BindingChange::Couple => coupled.push(e),
            BindingChange::Decouple => decoupled.push(e),
        }
    }
    (coupled, decoupled)
}

/// Signal propagation over a [`SignalNetwork`].
pub struct PropagationAutomaton {
    pub(crate) network: SignalNetwork,
    /// Seed nodes, re-activated at the start of every tick.
    pub(crate) inputs: BTreeSet<NodeId>,
    pub(crate) config: PropagationConfig,
    pub(crate) tick: u64,
}

impl PropagationAutomaton {
    pub fn new(network: SignalNetwork) -> Self {
        Self::with_config(network, PropagationConfig::default())
    }

    pub fn with_config(network: SignalNetwork, config: PropagationConfig) -> Self {
        Self {
            network,
            inputs: BTreeSet::new(),
            config,
            tick: 0,
        }
    }

    pub fn network(&self) -> &SignalNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut SignalNetwork {
        &mut self.network
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PropagationConfig) {
        self.config = config;
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Designate `name` as an input. Returns its id.
    pub fn add_input(&mut self, name: &str) -> Result<NodeId> {
        let id = self.network.id_by_name(name)?;
        self.inputs.insert(id);
        debug!(node = id.0, name, "propagation_input_added");
        Ok(id)
    }

    /// Stop seeding `name`. Returns whether it was an input.
    pub fn remove_input(&mut self, name: &str) -> Result<bool> {
        let id = self.network.id_by_name(name)?;
        Ok(self.inputs.remove(&id))
    }

    pub fn clear_inputs(&mut self) {
        self.inputs.clear();
    }

    pub fn inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.iter().copied()
    }

    /// Clear active and blocked flags and signal kinds on every node.
    pub fn reset_signals(&mut self) {
        for node in self.network.topology_mut().nodes_mut() {
            if let Some(signal) = node.signal.as_mut() {
                *signal = SignalState::default();
            }
        }
        debug!("propagation_signals_reset");
    }

    pub fn is_active(&self, name: &str) -> Result<bool> {
        Ok(self.network.node(name)?.is_active())
    }

    pub fn is_blocked(&self, name: &str) -> Result<bool> {
        Ok(self.network.node(name)?.is_blocked())
    }

    pub fn active_nodes(&self) -> Vec<NodeId> {
        self.network
            .topology()
            .nodes()
            .iter()
            .filter(|n| n.is_active())
            .map(|n| n.id)
            .collect()
    }

    pub fn blocked_nodes(&self) -> Vec<NodeId> {
        self.network
            .topology()
            .nodes()
            .iter()
            .filter(|n| n.is_blocked())
            .map(|n| n.id)
            .collect()
    }

    pub(crate) fn signal_mut(&mut self, id: NodeId) -> Option<&mut SignalState> {
        self.network
            .topology_mut()
            .node_mut(id)
            .and_then(|n| n.signal.as_mut())
    }

    fn node_active(&self, id: NodeId) -> bool {
        self.network.topology().node(id).is_some_and(|n| n.is_active())
    }

    /// Run one generation.
    ///
    /// Pulses last `tick_duration`. Strength changes are applied to the
    /// network and pushed into `layout`, which must have been installed
    /// from this network's topology.
    pub fn propagate(
        &mut self,
        layout: &mut LayoutEngine,
        tick_duration: Duration,
    ) -> Result<PropagationReport> {
        let started = Instant::now();
        let tick = self.tick;
        debug!(tick, inputs = self.inputs.len(), "propagation_tick_start");

        let inputs: Vec<NodeId> = self.inputs.iter().copied().collect();
        for id in inputs {
            if let Some(signal) = self.signal_mut(id) {
                signal.activate();
            }
        }

        let config = &self.config;
        let topology = self.network.topology();
        let mut schedule = Schedule::new();

        // Idle bindings loosen.
        for (i, edge) in topology.edges().iter().enumerate() {
            if edge.kind == Some(InteractionType::Binding)
                && !self.node_active(edge.end1)
                && !self.node_active(edge.end2)
                && edge.value > config.decouple_threshold
            {
                schedule.insert(EdgeId(i), BindingChange::Decouple);
            }
        }

        let active = self.active_nodes();
        let mut highlights = vec![
            Highlight::nodes(highlight::ACTIVE, config.positive_color, active.clone()),
            Highlight::nodes(highlight::BLOCKED, config.negative_color, self.blocked_nodes()),
        ];

        let mut next_active = BTreeSet::new();
        let mut next_blocked = BTreeSet::new();
        let mut pulses = Vec::new();
        let mut excited = Vec::new();
        let mut inhibited = Vec::new();
        for &node in &active {
            for e in topology.outgoing_edges(node)? {
                let Some(edge) = topology.edge(e) else {
                    continue;
                };
                match edge.kind {
                    Some(InteractionType::Inhibitory) => {
                        next_blocked.insert(edge.end2);
                        inhibited.push(e);
                        pulses.push(PulseEvent::new(
                            node,
                            edge.end2,
                            tick_duration,
                            config.negative_color,
                        ));
                    }
                    Some(InteractionType::Excitatory) => {
                        next_active.insert(edge.end2);
                        excited.push(e);
                        pulses.push(PulseEvent::new(
                            node,
                            edge.end2,
                            tick_duration,
                            config.positive_color,
                        ));
                    }
                    Some(InteractionType::Binding) => {
                        let change = if edge.value > config.decouple_threshold {
                            BindingChange::Decouple
                        } else {
                            BindingChange::Couple
                        };
                        schedule.insert(e, change);
                    }
                    _ => {}
                }
            }
        }

        highlights.push(Highlight::edges(highlight::EXCITED, config.positive_color, excited));
        highlights.push(Highlight::edges(
            highlight::INHIBITED,
            config.negative_color,
            inhibited,
        ));

        // Commit.
        for node in self.network.topology_mut().nodes_mut() {
            if let Some(signal) = node.signal.as_mut() {
                signal.deactivate();
                signal.unblock();
            }
        }
        for &id in &next_blocked {
            if let Some(signal) = self.signal_mut(id) {
                signal.block();
            }
        }
        for &id in &next_active {
            if let Some(signal) = self.signal_mut(id) {
                signal.activate();
            }
        }

        let (coupled, decoupled) = split_schedule(&schedule);
        self.push_strengths(layout, &schedule)?;
        self.tick += 1;

        let report = PropagationReport {
            tick,
            highlights,
            pulses,
            coupled,
            decoupled,
            next_active: next_active.into_iter().collect(),
            next_blocked: next_blocked.into_iter().collect(),
            duration: started.elapsed(),
        };
        info!(
            tick,
            active = report.next_active.len(),
            blocked = report.next_blocked.len(),
            pulses = report.pulses.len(),
            coupled = report.coupled.len(),
            decoupled = report.decoupled.len(),
            "propagation_tick_complete"
        );
        Ok(report)
    }

    /// Write `schedule` into the network and, in one snapshot/rebuild, into the layout.
    pub(crate) fn push_strengths(
        &mut self,
        layout: &mut LayoutEngine,
        schedule: &Schedule,
    ) -> Result<()> {
        if schedule.is_empty() {
            return Ok(());
        }
        let edges = self.network.topology().edge_count();
        if layout.links().len() != edges {
            return Err(PropagationError::OutOfSync {
                links: layout.links().len(),
                edges,
            });
        }

        let mut applied = Vec::with_capacity(schedule.len());
        for (&e, &change) in schedule {
            let strength = change.strength(&self.config);
            if let Some(edge) = self.network.topology_mut().edge_mut(e) {
                edge.set_value(strength);
                applied.push((e, edge.value));
            }
        }
        layout.with_snapshot(|snapshot| {
            for &(e, value) in &applied {
                if let Some(edge) = snapshot.edge_mut(e) {
                    edge.value = value;
                }
            }
        })?;
        debug!(edges = applied.len(), "propagation_strengths_pushed");
        Ok(())
    }
}

impl std::fmt::Debug for PropagationAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationAutomaton")
            .field("nodes", &self.network.topology().node_count())
            .field("edges", &self.network.topology().edge_count())
            .field("inputs", &self.inputs)
            .field("tick", &self.tick)
            .finish()
    }
}

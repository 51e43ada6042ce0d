//! Name-indexed signaling networks and interaction-table ingestion.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TopologyError};
use crate::model::{Edge, EdgeId, InteractionType, Node, NodeId};
use crate::topology::{Topology, UNIT_LENGTH};
use crate::Color;

/// Number of fields in a table row: name, id, other id, type, cat1, cat2, cat3.
const TABLE_FIELDS: usize = 7;

/// An interaction edge together with its id.
pub type Interaction<'a> = (EdgeId, &'a Edge);

/// A [`Topology`] of named signaling nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalNetwork {
    topology: Topology,
    names: HashMap<String, NodeId>,
}

/// An interaction collected during the first pass, linked in the second.
struct PendingInteraction {
    line: usize,
    source: i64,
    target: i64,
    kind: InteractionType,
}

impl SignalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signaling node. Fails with `InvalidArgument` if the name is taken.
    pub fn add_node(&mut self, name: impl Into<String>, color: Color) -> Result<NodeId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(TopologyError::InvalidArgument(format!(
                "duplicate node name {name:?}"
            )));
        }
        let id = self
            .topology
            .add_node(Node::signaling(name.clone(), 1.0, color));
        self.names.insert(name, id);
        Ok(id)
    }

    /// Add a typed interaction `source -> target` with the type's initial strength.
    pub fn add_interaction(
        &mut self,
        source: &str,
        target: &str,
        kind: InteractionType,
    ) -> Result<EdgeId> {
        let a = self.id_by_name(source)?;
        let b = self.id_by_name(target)?;
        let strength = kind.initial_strength();
        Ok(self.topology.add_typed_edge(a, b, UNIT_LENGTH, strength, kind))
    }

    /// Parse a tab- or comma-delimited interaction table.
    ///
    /// Rows are `name, id, otherId, edgeType, cat1, cat2, cat3`. The first
    /// row carrying an `id` registers the node `name` with color
    /// `(cat1, cat2, cat3)`. A non-empty `edgeType` adds the interaction
    /// `id -> otherId`; interactions are linked after every row is read, so
    /// forward references are allowed. Any malformed row aborts the load.
    pub fn from_table_str(text: &str) -> Result<Self> {
        let mut network = Self::new();
        let mut by_table_id: HashMap<i64, NodeId> = HashMap::new();
        let mut pending: Vec<PendingInteraction> = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = raw.split(['\t', ',']).map(str::trim).collect();
            if parts.len() < TABLE_FIELDS {
                return Err(TopologyError::parse(
                    line,
                    format!("expected {TABLE_FIELDS} fields, found {}", parts.len()),
                ));
            }
            let name = parts[0];
            let id: i64 = parse_field(parts[1], "id", line)?;
            let edge_type = parts[3];
            let category: [i32; 3] = [
                parse_field(parts[4], "cat1", line)?,
                parse_field(parts[5], "cat2", line)?,
                parse_field(parts[6], "cat3", line)?,
            ];

            if !by_table_id.contains_key(&id) {
                if network.names.contains_key(name) {
                    return Err(TopologyError::parse(
                        line,
                        format!("name {name:?} already registered under another id"),
                    ));
                }
                let color = Color::rgb(category[0] as f32, category[1] as f32, category[2] as f32);
                let node = network.add_node(name, color)?;
                by_table_id.insert(id, node);
            }

            if !edge_type.is_empty() {
                pending.push(PendingInteraction {
                    line,
                    source: id,
                    target: parse_field(parts[2], "otherId", line)?,
                    kind: InteractionType::parse(edge_type),
                });
            }
        }

        for interaction in pending {
            let resolve = |table_id: i64| {
                by_table_id.get(&table_id).copied().ok_or_else(|| {
                    TopologyError::parse(interaction.line, format!("unknown node id {table_id}"))
                })
            };
            let a = resolve(interaction.source)?;
            let b = resolve(interaction.target)?;
            let strength = interaction.kind.initial_strength();
            network
                .topology
                .add_typed_edge(a, b, UNIT_LENGTH, strength, interaction.kind);
        }

        info!(
            nodes = network.topology.node_count(),
            interactions = network.topology.edge_count(),
            "network_loaded"
        );
        Ok(network)
    }

    pub fn from_table_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_table_str(&text)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.names.iter().map(|(name, &id)| (name.as_str(), id))
    }

    pub fn id_by_name(&self, name: &str) -> Result<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| TopologyError::unknown(name))
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.topology.node(id).and_then(Node::label)
    }

    pub fn node(&self, name: &str) -> Result<&Node> {
        let id = self.id_by_name(name)?;
        self.topology
            .node(id)
            .ok_or_else(|| TopologyError::unknown(name))
    }

    pub fn node_mut(&mut self, name: &str) -> Result<&mut Node> {
        let id = self.id_by_name(name)?;
        self.topology
            .node_mut(id)
            .ok_or_else(|| TopologyError::unknown(name))
    }

    fn resolve_edges(&self, ids: impl IntoIterator<Item = EdgeId>) -> Vec<Interaction<'_>> {
        ids.into_iter()
            .filter_map(|e| self.topology.edge(e).map(|edge| (e, edge)))
            .collect()
    }

    /// Every interaction connecting `a` and `b`, in either direction.
    pub fn interactions_between(&self, a: &str, b: &str) -> Result<Vec<Interaction<'_>>> {
        let a = self.id_by_name(a)?;
        let b = self.id_by_name(b)?;
        Ok(self.resolve_edges(self.topology.edge_indices(a, b)))
    }

    /// Every interaction touching `name`.
    pub fn interactions(&self, name: &str) -> Result<Vec<Interaction<'_>>> {
        let id = self.id_by_name(name)?;
        Ok(self.resolve_edges(self.topology.edges_of(id)?.iter().copied()))
    }

    /// Interactions whose source is `name`.
    pub fn outgoing_interactions(&self, name: &str) -> Result<Vec<Interaction<'_>>> {
        let id = self.id_by_name(name)?;
        Ok(self.resolve_edges(self.topology.outgoing_edges(id)?))
    }

    /// Interactions whose target is `name`.
    pub fn incoming_interactions(&self, name: &str) -> Result<Vec<Interaction<'_>>> {
        let id = self.id_by_name(name)?;
        Ok(self.resolve_edges(self.topology.incoming_edges(id)?))
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, field: &str, line: usize) -> Result<T> {
    raw.parse()
        .map_err(|_| TopologyError::parse(line, format!("invalid {field}: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
P1\t1\t2\t+\t0\t1\t0
P2\t2\t3\t-\t1\t0\t0

P3\t3\t\t\t0\t0\t1
P2\t2\t1\tb\t1\t0\t0
P3\t3\t1\tz\t0\t0\t1
";

    #[test]
    fn test_two_pass_ingestion() {
        let net = SignalNetwork::from_table_str(TABLE).unwrap();
        let t = net.topology();
        assert_eq!(t.node_count(), 3);
        assert_eq!(t.edge_count(), 4);

        let p1 = net.id_by_name("P1").unwrap();
        let p2 = net.id_by_name("P2").unwrap();
        let e = t.edge(t.edge_index(p1, p2).unwrap()).unwrap();
        assert_eq!(e.kind, Some(InteractionType::Excitatory));
        assert_eq!(e.value, 0.5);

        let outgoing = net.outgoing_interactions("P2").unwrap();
        let strengths: Vec<f32> = outgoing.iter().map(|(_, e)| e.value).collect();
        assert_eq!(strengths, vec![0.5, 5.0]);

        let inert = net.outgoing_interactions("P3").unwrap();
        assert_eq!(inert.len(), 1);
        assert!(inert[0].1.is_inert());
        assert_eq!(inert[0].1.value, 0.0);

        assert_eq!(net.node("P2").unwrap().color, Color::rgb(1.0, 0.0, 0.0));
        assert!(net.node("P2").unwrap().is_signaling());
    }

    #[test]
    fn test_comma_delimited_rows() {
        let net = SignalNetwork::from_table_str("A,10,20,+,0,0,0\nB,20,,,0,0,0\n").unwrap();
        assert_eq!(net.interactions_between("A", "B").unwrap().len(), 1);
        assert_eq!(net.incoming_interactions("B").unwrap().len(), 1);
        assert!(net.outgoing_interactions("B").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_name() {
        let net = SignalNetwork::from_table_str(TABLE).unwrap();
        let err = net.id_by_name("P9").unwrap_err();
        assert!(matches!(err, TopologyError::UnknownEntity { ref name } if name == "P9"));
        assert!(net.interactions("P9").is_err());
    }

    #[test]
    fn test_malformed_rows_abort() {
        let cases = [
            "A\t1\t2\t+\t0\t0\n",
            "A\tx\t2\t+\t0\t0\t0\n",
            "A\t1\t2\t+\t0\tq\t0\n",
            "A\t1\tfoo\t+\t0\t0\t0\n",
            "A\t1\t7\t+\t0\t0\t0\n",
            "A\t1\t\t\t0\t0\t0\nA\t2\t\t\t0\t0\t0\n",
        ];
        for table in cases {
            let err = SignalNetwork::from_table_str(table).unwrap_err();
            assert!(
                matches!(err, TopologyError::Parse { .. }),
                "{table:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_add_interaction_by_name() {
        let mut net = SignalNetwork::new();
        net.add_node("A", Color::WHITE).unwrap();
        net.add_node("B", Color::WHITE).unwrap();
        assert!(net.add_node("A", Color::WHITE).is_err());
        let e = net
            .add_interaction("A", "B", InteractionType::Binding)
            .unwrap();
        assert_eq!(net.topology().edge(e).unwrap().value, 5.0);
        assert!(net.add_interaction("A", "C", InteractionType::Binding).is_err());
    }
}

//! Graph storage, structural queries, generators and shortest paths.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use ordered_float::OrderedFloat;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TopologyError};
use crate::model::{Edge, EdgeId, InteractionType, Node, NodeId};

/// Rest length of edges created by [`Topology::add_children`] and the generators.
pub const UNIT_LENGTH: f32 = 1.0;
/// Strength of edges created by [`Topology::add_children`] and the generators.
pub const DEFAULT_VALUE: f32 = 0.1;

/// Node list, edge list and the adjacency list mirroring the edges.
///
/// Every edge id appears in the adjacency of both of its endpoints (twice in
/// the adjacency of a self-loop's node). Nodes are never removed; a merged
/// node stays in storage with an empty adjacency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    adjacency: Vec<Vec<EdgeId>>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.0)
    }

    /// Mutable access to every node, for bulk state changes.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Append a node, assign it the next id and give it an empty adjacency.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        id
    }

    /// Append an untyped edge.
    ///
    /// # Panics
    ///
    /// Endpoints are not range-checked beyond slice indexing: passing an id
    /// that was never returned by [`Topology::add_node`] panics.
    pub fn add_edge(&mut self, end1: NodeId, end2: NodeId, length: f32, value: f32) -> EdgeId {
        self.insert_edge(Edge::new(end1, end2, length, value))
    }

    /// Append a typed interaction edge. Inert types are stored with strength 0.
    ///
    /// # Panics
    ///
    /// Same contract as [`Topology::add_edge`].
    pub fn add_typed_edge(
        &mut self,
        end1: NodeId,
        end2: NodeId,
        length: f32,
        value: f32,
        kind: InteractionType,
    ) -> EdgeId {
        self.insert_edge(Edge::typed(end1, end2, length, value, kind))
    }

    /// Append a prepared edge and register it with both endpoints.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is not a node of this topology.
    pub fn insert_edge(&mut self, edge: Edge) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.adjacency[edge.end1.0].push(id);
        self.adjacency[edge.end2.0].push(id);
        self.edges.push(edge);
        id
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if self.contains_node(id) {
            Ok(())
        } else {
            Err(TopologyError::InvalidArgument(format!(
                "node {id} out of range (node count {})",
                self.nodes.len()
            )))
        }
    }

    /// Merge two nodes into the lower-indexed one.
    ///
    /// Every edge incident to the higher-indexed (detached) node is rewritten
    /// in place to reference the remaining node, one endpoint per adjacency
    /// occurrence. The rewritten ids are appended to the remaining node's
    /// adjacency and the detached node's adjacency is cleared. Edge count is
    /// unchanged; duplicate edges and self-loops created by the merge are kept.
    pub fn merge_nodes(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.check_node(a)?;
        self.check_node(b)?;
        if a == b {
            return Ok(());
        }
        let detached = a.max(b);
        let remain = a.min(b);

        let moved = std::mem::take(&mut self.adjacency[detached.0]);
        for &edge_id in &moved {
            let edge = &mut self.edges[edge_id.0];
            if edge.end1 == detached {
                edge.end1 = remain;
            } else {
                edge.end2 = remain;
            }
        }
        debug!(
            remain = remain.0,
            detached = detached.0,
            rewritten = moved.len(),
            "topology_nodes_merged"
        );
        self.adjacency[remain.0].extend(moved);
        Ok(())
    }

    /// Merge the two endpoints of an edge.
    pub fn collapse_edge(&mut self, edge: EdgeId) -> Result<()> {
        let (end1, end2) = match self.edges.get(edge.0) {
            Some(e) => (e.end1, e.end2),
            None => {
                return Err(TopologyError::InvalidArgument(format!(
                    "edge {edge} out of range (edge count {})",
                    self.edges.len()
                )))
            }
        };
        self.merge_nodes(end1, end2)
    }

    /// Incident edge ids of `node`, in insertion order.
    pub fn edges_of(&self, node: NodeId) -> Result<&[EdgeId]> {
        self.check_node(node)?;
        Ok(&self.adjacency[node.0])
    }

    /// Neighbors of `node`, one entry per incident edge.
    pub fn adjacent_nodes(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .edges_of(node)?
            .iter()
            .map(|&e| self.edges[e.0].other_end(node))
            .collect())
    }

    /// Incident edges whose source (`end1`) is `node`.
    pub fn outgoing_edges(&self, node: NodeId) -> Result<Vec<EdgeId>> {
        self.directed_edges(node, |e| e.end1 == node)
    }

    /// Incident edges whose target (`end2`) is `node`.
    pub fn incoming_edges(&self, node: NodeId) -> Result<Vec<EdgeId>> {
        self.directed_edges(node, |e| e.end2 == node)
    }

    fn directed_edges(&self, node: NodeId, keep: impl Fn(&Edge) -> bool) -> Result<Vec<EdgeId>> {
        let mut out: Vec<EdgeId> = Vec::new();
        for &e in self.edges_of(node)? {
            // A self-loop is listed twice but reported once.
            if keep(&self.edges[e.0]) && !out.contains(&e) {
                out.push(e);
            }
        }
        Ok(out)
    }

    /// First edge connecting `a` and `b`, scanning `a`'s adjacency in insertion order.
    pub fn edge_index(&self, a: NodeId, b: NodeId) -> Result<EdgeId> {
        self.check_node(a)?;
        self.adjacency[a.0]
            .iter()
            .copied()
            .find(|&e| self.edges[e.0].touches(b))
            .ok_or(TopologyError::NotAdjacent { a, b })
    }

    /// Every edge connecting `a` and `b`. Empty when they are not adjacent
    /// or when `a` is out of range.
    pub fn edge_indices(&self, a: NodeId, b: NodeId) -> Vec<EdgeId> {
        self.adjacency
            .get(a.0)
            .map(|adj| {
                adj.iter()
                    .copied()
                    .filter(|&e| self.edges[e.0].touches(b))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append `count` leaves to `parent`, each joined by a unit-length edge.
    ///
    /// Returns `false` without mutating when `count` is zero or `parent` is
    /// out of range.
    pub fn add_children(&mut self, count: usize, parent: NodeId) -> bool {
        if count == 0 || !self.contains_node(parent) {
            return false;
        }
        for _ in 0..count {
            let child = self.add_node(Node::new());
            self.add_edge(parent, child, UNIT_LENGTH, DEFAULT_VALUE);
        }
        true
    }

    /// A root with `children` leaves.
    pub fn hub(children: usize) -> Self {
        let mut topology = Self::new();
        let root = topology.add_node(Node::new());
        topology.add_children(children, root);
        topology
    }

    /// A path of `n` nodes. Always holds at least one node.
    pub fn string(n: usize) -> Self {
        let mut topology = Self::new();
        let mut prev = topology.add_node(Node::new());
        for _ in 1..n {
            let next = topology.add_node(Node::new());
            topology.add_edge(prev, next, UNIT_LENGTH, DEFAULT_VALUE);
            prev = next;
        }
        topology
    }

    /// A path of `n` nodes closed by an edge from the last node back to the first.
    pub fn ring(n: usize) -> Self {
        let mut topology = Self::string(n);
        let last = NodeId(topology.node_count() - 1);
        topology.add_edge(last, NodeId(0), UNIT_LENGTH, DEFAULT_VALUE);
        topology
    }

    /// A breadth-first tree of `n` nodes where every parent has at most `arity` children.
    ///
    /// Returns `None` when `arity` is zero and more than one node is requested.
    pub fn tree(n: usize, arity: usize) -> Option<Self> {
        let mut topology = Self::new();
        if n == 0 {
            return Some(topology);
        }
        if arity == 0 && n > 1 {
            return None;
        }
        topology.add_node(Node::new());

        let mut growable: VecDeque<(NodeId, usize)> = VecDeque::new();
        growable.push_back((NodeId(0), 0));
        while topology.node_count() < n {
            let Some(&(parent, children)) = growable.front() else {
                break;
            };
            if children >= arity {
                growable.pop_front();
                continue;
            }
            topology.add_children(1, parent);
            if let Some(front) = growable.front_mut() {
                front.1 += 1;
            }
            growable.push_back((NodeId(topology.node_count() - 1), 0));
        }
        Some(topology)
    }

    /// [`Topology::tree`] with arity 2.
    pub fn binary_tree(n: usize) -> Self {
        Self::tree(n, 2).unwrap_or_default()
    }

    /// Single-source shortest distances by edge length.
    ///
    /// Among equal tentative distances the lowest node id is finalized first.
    /// Unreachable nodes get `f32::INFINITY`. Edge lengths are assumed positive.
    pub fn shortest_paths(&self, source: NodeId) -> Result<Vec<f32>> {
        self.check_node(source)?;
        let mut distances = vec![f32::INFINITY; self.nodes.len()];
        let mut finalized = vec![false; self.nodes.len()];
        let mut frontier = BinaryHeap::new();

        distances[source.0] = 0.0;
        frontier.push(Reverse((OrderedFloat(0.0f32), source)));

        while let Some(Reverse((OrderedFloat(dist), node))) = frontier.pop() {
            if finalized[node.0] {
                continue;
            }
            finalized[node.0] = true;
            for &e in &self.adjacency[node.0] {
                let edge = &self.edges[e.0];
                let neighbor = edge.other_end(node);
                if finalized[neighbor.0] {
                    continue;
                }
                let candidate = dist + edge.length;
                if candidate < distances[neighbor.0] {
                    distances[neighbor.0] = candidate;
                    frontier.push(Reverse((OrderedFloat(candidate), neighbor)));
                }
            }
        }
        Ok(distances)
    }

    /// Closeness centrality: sum of `1 / distance` to every other node.
    /// Unreachable nodes contribute nothing.
    pub fn centrality(&self, node: NodeId) -> Result<f32> {
        let distances = self.shortest_paths(node)?;
        Ok(distances
            .iter()
            .enumerate()
            .filter(|&(i, d)| i != node.0 && d.is_finite())
            .map(|(_, d)| 1.0 / d)
            .sum())
    }

    /// Undirected petgraph view; node weights are ids, edge weights are lengths.
    ///
    /// The returned vector maps `NodeId.0` to the petgraph index.
    pub fn to_petgraph(&self) -> (StableUnGraph<NodeId, f32>, Vec<NodeIndex>) {
        let mut graph = StableUnGraph::with_capacity(self.nodes.len(), self.edges.len());
        let indices: Vec<NodeIndex> = self.nodes.iter().map(|n| graph.add_node(n.id)).collect();
        for edge in &self.edges {
            graph.add_edge(indices[edge.end1.0], indices[edge.end2.0], edge.length);
        }
        (graph, indices)
    }
}

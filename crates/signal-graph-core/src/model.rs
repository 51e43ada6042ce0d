//! Node and edge records.
//!
//! A single [`Node`] type carries optional components (position, label,
//! signaling state) instead of a hierarchy of node kinds; callers check for
//! a capability with the accessors rather than inspecting a type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Color, Vec3};

/// Identifier for nodes within a [`crate::Topology`]. Dense, assigned at insertion.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

/// Identifier for edges within a [`crate::Topology`]. Dense, assigned at insertion.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EdgeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signal carried by a node in the signal-kind propagation generation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// No signal.
    #[default]
    None,
    /// Activating signal.
    Plus,
    /// Inhibiting signal.
    Minus,
    /// Chain terminator: receives but never forwards.
    End,
}

impl SignalKind {
    /// Swap `Plus` and `Minus`; `None` and `End` are unchanged.
    pub fn flipped(self) -> Self {
        match self {
            SignalKind::Plus => SignalKind::Minus,
            SignalKind::Minus => SignalKind::Plus,
            other => other,
        }
    }

    /// Whether this kind carries a polarity (`Plus` or `Minus`).
    pub fn is_polar(self) -> bool {
        matches!(self, SignalKind::Plus | SignalKind::Minus)
    }
}

/// Signaling component of a node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub active: bool,
    pub blocked: bool,
    pub kind: SignalKind,
}

impl SignalState {
    /// Mark the node active. Fails silently (returns `false`) while blocked.
    pub fn activate(&mut self) -> bool {
        if self.blocked {
            return false;
        }
        self.active = true;
        true
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Block the node. Stays blocked until [`SignalState::unblock`].
    pub fn block(&mut self) {
        self.blocked = true;
    }

    pub fn unblock(&mut self) {
        self.blocked = false;
    }
}

/// A graph node with optional components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Assigned by [`crate::Topology::add_node`].
    pub id: NodeId,
    /// Spatial position, if the node has been placed.
    pub position: Option<Vec3>,
    /// Display size.
    pub size: f32,
    /// Display color.
    pub color: Color,
    /// Human readable name.
    pub label: Option<String>,
    /// Signaling state, present for nodes that take part in propagation.
    pub signal: Option<SignalState>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            id: NodeId::default(),
            position: None,
            size: 1.0,
            color: Color::WHITE,
            label: None,
            signal: None,
        }
    }
}

impl Node {
    /// A bare node with default size and color and no components.
    pub fn new() -> Self {
        Self::default()
    }

    /// A placed node.
    pub fn spatial(position: Vec3, size: f32, color: Color) -> Self {
        Self {
            position: Some(position),
            size,
            color,
            ..Self::default()
        }
    }

    /// A named signaling node, not yet placed.
    pub fn signaling(label: impl Into<String>, size: f32, color: Color) -> Self {
        Self {
            size,
            color,
            label: Some(label.into()),
            signal: Some(SignalState::default()),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_signal(mut self, signal: SignalState) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_signaling(&self) -> bool {
        self.signal.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.signal.is_some_and(|s| s.active)
    }

    pub fn is_blocked(&self) -> bool {
        self.signal.is_some_and(|s| s.blocked)
    }

    pub fn signal_kind(&self) -> SignalKind {
        self.signal.map(|s| s.kind).unwrap_or_default()
    }
}

/// Type tag of an interaction edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionType {
    /// `+`: the source activates the target.
    Excitatory,
    /// `-`: the source blocks the target.
    Inhibitory,
    /// `b`: the endpoints bind; strength toggles between coupled and decoupled.
    Binding,
    /// Any other tag. Permanently inert, strength 0.
    Inert(String),
}

impl InteractionType {
    /// Strength assigned to a freshly ingested excitatory or inhibitory edge.
    pub const SIGNAL_STRENGTH: f32 = 0.5;
    /// Strength assigned to a freshly ingested binding edge.
    pub const BINDING_STRENGTH: f32 = 5.0;

    /// Classify a tag by its first character.
    pub fn parse(tag: &str) -> Self {
        match tag.chars().next() {
            Some('+') => InteractionType::Excitatory,
            Some('-') => InteractionType::Inhibitory,
            Some('b') => InteractionType::Binding,
            Some(c) => InteractionType::Inert(c.to_string()),
            None => InteractionType::Inert(String::new()),
        }
    }

    /// Tag as written in tables and layout files.
    pub fn tag(&self) -> &str {
        match self {
            InteractionType::Excitatory => "+",
            InteractionType::Inhibitory => "-",
            InteractionType::Binding => "b",
            InteractionType::Inert(tag) => tag,
        }
    }

    pub fn initial_strength(&self) -> f32 {
        match self {
            InteractionType::Excitatory | InteractionType::Inhibitory => Self::SIGNAL_STRENGTH,
            InteractionType::Binding => Self::BINDING_STRENGTH,
            InteractionType::Inert(_) => 0.0,
        }
    }

    pub fn is_inert(&self) -> bool {
        matches!(self, InteractionType::Inert(_))
    }
}

/// An edge between two nodes. `end1` is the source of a typed interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub end1: NodeId,
    pub end2: NodeId,
    /// Rest length used by shortest paths and the spring force.
    pub length: f32,
    /// Strength of the connection.
    pub value: f32,
    /// Interaction tag; `None` for untyped edges.
    pub kind: Option<InteractionType>,
}

impl Edge {
    pub fn new(end1: NodeId, end2: NodeId, length: f32, value: f32) -> Self {
        Self {
            end1,
            end2,
            length,
            value,
            kind: None,
        }
    }

    /// A typed interaction. Inert types get strength 0 regardless of `value`.
    pub fn typed(end1: NodeId, end2: NodeId, length: f32, value: f32, kind: InteractionType) -> Self {
        let value = if kind.is_inert() { 0.0 } else { value };
        Self {
            end1,
            end2,
            length,
            value,
            kind: Some(kind),
        }
    }

    /// Whichever endpoint is not `node`. For a self-loop this is `node` itself.
    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.end1 != node {
            self.end1
        } else {
            self.end2
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.end1 == node || self.end2 == node
    }

    pub fn is_inert(&self) -> bool {
        self.kind.as_ref().is_some_and(InteractionType::is_inert)
    }

    /// Change the strength. Inert edges stay at 0.
    pub fn set_value(&mut self, value: f32) {
        self.value = if self.is_inert() { 0.0 } else { value };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_type_parse() {
        assert_eq!(InteractionType::parse("+"), InteractionType::Excitatory);
        assert_eq!(InteractionType::parse("-"), InteractionType::Inhibitory);
        assert_eq!(InteractionType::parse("bind"), InteractionType::Binding);
        assert_eq!(
            InteractionType::parse("x"),
            InteractionType::Inert("x".to_string())
        );
        assert!(InteractionType::parse("").is_inert());
    }

    #[test]
    fn test_inert_edge_stays_at_zero() {
        let mut edge = Edge::typed(
            NodeId(0),
            NodeId(1),
            1.0,
            3.0,
            InteractionType::parse("?"),
        );
        assert_eq!(edge.value, 0.0);
        edge.set_value(5.0);
        assert_eq!(edge.value, 0.0);
    }

    #[test]
    fn test_blocked_node_refuses_activation() {
        let mut state = SignalState::default();
        state.block();
        assert!(!state.activate());
        assert!(!state.active);
        state.unblock();
        assert!(state.activate());
        assert!(state.active);
    }

    #[test]
    fn test_signal_kind_flip() {
        assert_eq!(SignalKind::Plus.flipped(), SignalKind::Minus);
        assert_eq!(SignalKind::Minus.flipped(), SignalKind::Plus);
        assert_eq!(SignalKind::End.flipped(), SignalKind::End);
    }

    #[test]
    fn test_other_end() {
        let edge = Edge::new(NodeId(2), NodeId(5), 1.0, 0.1);
        assert_eq!(edge.other_end(NodeId(2)), NodeId(5));
        assert_eq!(edge.other_end(NodeId(5)), NodeId(2));
        let lp = Edge::new(NodeId(3), NodeId(3), 1.0, 0.1);
        assert_eq!(lp.other_end(NodeId(3)), NodeId(3));
    }
}

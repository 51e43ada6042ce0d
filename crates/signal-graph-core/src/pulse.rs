//! Highlight sets and timed pulse events handed to renderers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{EdgeId, NodeId};
use crate::Color;

/// A named set of nodes and edges drawn with one color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub name: String,
    pub color: Color,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

impl Highlight {
    pub fn nodes(name: impl Into<String>, color: Color, nodes: Vec<NodeId>) -> Self {
        Self {
            name: name.into(),
            color,
            nodes,
            edges: Vec::new(),
        }
    }

    pub fn edges(name: impl Into<String>, color: Color, edges: Vec<EdgeId>) -> Self {
        Self {
            name: name.into(),
            color,
            nodes: Vec::new(),
            edges,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// A pulse travelling from `source` to `target` over `lifetime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseEvent {
    pub source: NodeId,
    pub target: NodeId,
    pub lifetime: Duration,
    pub color: Color,
    progress: f32,
}

impl PulseEvent {
    pub fn new(source: NodeId, target: NodeId, lifetime: Duration, color: Color) -> Self {
        Self {
            source,
            target,
            lifetime,
            color,
            progress: 0.0,
        }
    }

    /// Travelled fraction, always in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Advance by `elapsed`. Returns `false` once the pulse has arrived.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        let step = if self.lifetime.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f32() / self.lifetime.as_secs_f32()
        };
        self.progress = (self.progress + step).clamp(0.0, 1.0);
        !self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.progress >= 1.0
    }
}

/// Pulses in flight. Finished pulses are retired on [`PulseTrack::advance`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseTrack {
    pulses: Vec<PulseEvent>,
}

impl PulseTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pulse: PulseEvent) {
        self.pulses.push(pulse);
    }

    /// Advance every pulse and drop the finished ones. Returns how many were retired.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        let before = self.pulses.len();
        self.pulses.retain_mut(|p| p.advance(elapsed));
        before - self.pulses.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PulseEvent> {
        self.pulses.iter()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
    }
}

impl Extend<PulseEvent> for PulseTrack {
    fn extend<I: IntoIterator<Item = PulseEvent>>(&mut self, iter: I) {
        self.pulses.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_progress_clamps_and_retires() {
        let mut track = PulseTrack::new();
        track.push(PulseEvent::new(
            NodeId(0),
            NodeId(1),
            Duration::from_millis(500),
            Color::GREEN,
        ));
        track.push(PulseEvent::new(
            NodeId(1),
            NodeId(2),
            Duration::from_millis(2000),
            Color::RED,
        ));

        assert_eq!(track.advance(Duration::from_millis(250)), 0);
        let progress: Vec<f32> = track.iter().map(PulseEvent::progress).collect();
        assert!((progress[0] - 0.5).abs() < 1e-6);
        assert!((progress[1] - 0.125).abs() < 1e-6);

        assert_eq!(track.advance(Duration::from_millis(400)), 1);
        assert_eq!(track.len(), 1);
        assert_eq!(track.iter().next().unwrap().target, NodeId(2));
    }

    #[test]
    fn test_zero_lifetime_finishes_immediately() {
        let mut pulse = PulseEvent::new(NodeId(0), NodeId(0), Duration::ZERO, Color::WHITE);
        assert!(!pulse.advance(Duration::ZERO));
        assert_eq!(pulse.progress(), 1.0);
    }
}

//! Propagation tuning.

use serde::{Deserialize, Serialize};
use signal_graph_core::Color;

/// Strengths and colors used by a propagation tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Strength of a coupled binding edge.
    pub couple_strength: f32,
    /// Strength of a decoupled binding edge.
    pub decouple_strength: f32,
    /// Binding edges stronger than this count as coupled.
    pub decouple_threshold: f32,
    /// Highlight and pulse color for activation.
    pub positive_color: Color,
    /// Highlight and pulse color for blocking.
    pub negative_color: Color,
    /// Highlight color for chain terminators.
    pub end_color: Color,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            couple_strength: 5.0,
            decouple_strength: 0.5,
            decouple_threshold: 1.0,
            positive_color: Color::GREEN,
            negative_color: Color::RED,
            end_color: Color::WHITE,
        }
    }
}

//! Run configuration.
//!
//! One JSON file holds the layout and propagation tuning, the category
//! constraints and the input names. Every field is optional.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use signal_graph_automaton::PropagationConfig;
use signal_graph_core::{SignalNetwork, Vec3};
use signal_graph_layout::{LayoutConfig, LayoutEngine};
use tracing::{debug, warn};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "SIGNAL_GRAPH_CONFIG";

/// A clustering constraint, members given by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub members: Vec<String>,
    #[serde(default)]
    pub center: [f32; 3],
    pub radius: f32,
}

/// Everything `sgv run` can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub layout: LayoutConfig,
    pub propagation: PropagationConfig,
    pub categories: Vec<CategoryConfig>,
    /// Node names seeded every propagation tick.
    pub inputs: Vec<String>,
    /// Time between propagation ticks.
    pub propagation_interval_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            propagation: PropagationConfig::default(),
            categories: Vec::new(),
            inputs: Vec::new(),
            propagation_interval_ms: 500,
        }
    }
}

impl RunConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            warn!(path = %path.display(), "config_missing_using_defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config = Self::from_json(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn propagation_interval(&self) -> Duration {
        Duration::from_millis(self.propagation_interval_ms)
    }

    /// Register every category on `layout`, resolving member names in `network`.
    pub fn apply_categories(&self, network: &SignalNetwork, layout: &mut LayoutEngine) -> Result<()> {
        for (i, category) in self.categories.iter().enumerate() {
            let members = category
                .members
                .iter()
                .map(|name| network.id_by_name(name))
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("Category {i} names an unknown node"))?;
            layout
                .add_category(members, Vec3::from(category.center), category.radius)
                .with_context(|| format!("Category {i} is invalid"))?;
        }
        Ok(())
    }
}

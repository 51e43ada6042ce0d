//! The `centrality` command.

use std::path::Path;

use anyhow::{Context, Result};
use signal_graph_core::SignalNetwork;

/// Closeness centrality of every named node, most central first.
///
/// Ties keep name order.
pub fn ranking(network: &SignalNetwork) -> Result<Vec<(String, f32)>> {
    let mut scores = network
        .names()
        .map(|(name, id)| -> Result<(String, f32)> {
            Ok((name.to_owned(), network.topology().centrality(id)?))
        })
        .collect::<Result<Vec<_>>>()?;
    scores.sort_by(|a, b| a.0.cmp(&b.0));
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(scores)
}

/// Execute `sgv centrality`.
pub fn execute(path: &Path, top: Option<usize>) -> Result<()> {
    let network = SignalNetwork::from_table_file(path)
        .with_context(|| format!("Failed to load network from {}", path.display()))?;
    let scores = ranking(&network)?;

    println!("📈 Closeness centrality ({} nodes):", scores.len());
    for (name, score) in scores.iter().take(top.unwrap_or(usize::MAX)) {
        println!("   {name:<16} {score:.4}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_graph_core::{Color, InteractionType};

    #[test]
    fn test_middle_of_path_ranks_first() {
        let mut network = SignalNetwork::new();
        for name in ["a", "b", "c"] {
            network.add_node(name, Color::WHITE).unwrap();
        }
        network
            .add_interaction("a", "b", InteractionType::Excitatory)
            .unwrap();
        network
            .add_interaction("b", "c", InteractionType::Inhibitory)
            .unwrap();

        let scores = ranking(&network).unwrap();
        assert_eq!(scores[0].0, "b");
        assert!((scores[0].1 - 2.0).abs() < 1e-6);
        assert_eq!(scores[1].0, "a");
        assert_eq!(scores[2].0, "c");
    }
}

//! End-to-end propagation through a network loaded from a table.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_graph_automaton::{PropagationAutomaton, PropagationConfig};
use signal_graph_core::{EdgeId, InteractionType, SignalNetwork};
use signal_graph_layout::{CpuBackend, LayoutConfig, LayoutEngine};

const CHAIN: &str = "\
P1\t1\t2\t+\t0\t1\t0
P2\t2\t3\t-\t1\t0\t0
P3\t3\t\t\t0\t0\t1
";

const BINDING: &str = "\
A,10,11,b,1,1,0
B,11,,,0,1,1
C,12,10,+,1,0,1
";

const TICK: Duration = Duration::from_millis(500);

fn cpu_layout(network: &SignalNetwork) -> Result<LayoutEngine> {
    let mut layout =
        LayoutEngine::with_backend(LayoutConfig::default().cpu_only(), Box::new(CpuBackend::new()));
    layout.install_topology(network.topology(), &mut StdRng::seed_from_u64(4))?;
    Ok(layout)
}

fn names(automaton: &PropagationAutomaton, ids: &[signal_graph_core::NodeId]) -> Vec<String> {
    ids.iter()
        .filter_map(|&id| automaton.network().name_of(id))
        .map(str::to_owned)
        .collect()
}

#[test]
fn test_chain_scenario_over_three_ticks() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(CHAIN.as_bytes())?;
    let network = SignalNetwork::from_table_file(file.path())?;
    let mut layout = cpu_layout(&network)?;
    let mut automaton = PropagationAutomaton::new(network);
    automaton.add_input("P1")?;

    let tick1 = automaton.propagate(&mut layout, TICK)?;
    assert_eq!(names(&automaton, &tick1.next_active), ["P2"]);
    assert!(tick1.next_blocked.is_empty());
    assert!(!automaton.is_blocked("P3")?);

    let tick2 = automaton.propagate(&mut layout, TICK)?;
    assert_eq!(names(&automaton, &tick2.next_active), ["P2"]);
    assert_eq!(names(&automaton, &tick2.next_blocked), ["P3"]);
    assert!(automaton.is_blocked("P3")?);

    let tick3 = automaton.propagate(&mut layout, TICK)?;
    assert_eq!(tick3.tick, 2);
    assert!(automaton.is_blocked("P3")?);
    assert!(automaton.is_active("P2")?);
    assert!(!automaton.is_active("P3")?);
    // The highlight taken before the walk shows both seed and relay active.
    assert_eq!(names(&automaton, &tick3.highlights[0].nodes), ["P1", "P2"]);
    assert_eq!(names(&automaton, &tick3.highlights[1].nodes), ["P3"]);
    Ok(())
}

#[test]
fn test_idle_binding_decouples_once() -> Result<()> {
    let network = SignalNetwork::from_table_str(BINDING)?;
    let binding = EdgeId(0);
    assert_eq!(
        network.topology().edge(binding).map(|e| e.kind.clone()),
        Some(Some(InteractionType::Binding))
    );
    let mut layout = cpu_layout(&network)?;
    let mut automaton = PropagationAutomaton::new(network);

    let first = automaton.propagate(&mut layout, TICK)?;
    assert_eq!(first.decoupled, vec![binding]);
    assert_eq!(layout.links()[0].strength, 0.5);

    let second = automaton.propagate(&mut layout, TICK)?;
    assert!(!second.changed_strengths());
    Ok(())
}

#[test]
fn test_binding_recouples_only_from_active_source() -> Result<()> {
    let network = SignalNetwork::from_table_str(BINDING)?;
    let mut layout = cpu_layout(&network)?;
    let before = layout.positions();
    let mut automaton = PropagationAutomaton::new(network);

    automaton.propagate(&mut layout, TICK)?;
    automaton.add_input("C")?;

    // C excites A; A is only active after the commit.
    let excite = automaton.propagate(&mut layout, TICK)?;
    assert!(excite.coupled.is_empty());
    assert!(automaton.is_active("A")?);

    let couple = automaton.propagate(&mut layout, TICK)?;
    assert_eq!(couple.coupled, vec![EdgeId(0)]);
    assert_eq!(layout.links()[0].strength, 5.0);
    assert_eq!(
        automaton.network().topology().edge(EdgeId(0)).map(|e| e.value),
        Some(5.0)
    );

    // Strength pushes never move particles.
    assert_eq!(layout.positions(), before);
    Ok(())
}

#[test]
fn test_custom_strengths_reach_layout() -> Result<()> {
    let network = SignalNetwork::from_table_str(BINDING)?;
    let mut layout = cpu_layout(&network)?;
    let config = PropagationConfig {
        decouple_strength: 0.25,
        ..PropagationConfig::default()
    };
    let mut automaton = PropagationAutomaton::with_config(network, config);
    automaton.propagate(&mut layout, TICK)?;
    assert_eq!(layout.links()[0].strength, 0.25);
    Ok(())
}

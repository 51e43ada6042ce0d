//! Engine-level tests across backends.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use signal_graph_core::{Color, EdgeId, NodeId, Topology, Vec3};
use signal_graph_layout::{
    CommandQueue, CpuBackend, ForceBackend, ForceField, GpuBackend, LayoutConfig, LayoutEngine,
    LayoutError, Link, Particle, SimParams,
};

fn cpu_engine(topology: &Topology, seed: u64) -> Result<LayoutEngine> {
    let mut engine =
        LayoutEngine::with_backend(LayoutConfig::default().cpu_only(), Box::new(CpuBackend::new()));
    engine.install_topology(topology, &mut StdRng::seed_from_u64(seed))?;
    Ok(engine)
}

fn fixture() -> (Vec<Particle>, ForceField, SimParams) {
    let topology = Topology::ring(16);
    let particles: Vec<Particle> = (0..16)
        .map(|i| {
            let a = i as f32 * 0.4;
            Particle::new(
                Vec3::new(a.cos() * 10.0, a.sin() * 10.0, i as f32 * 0.5),
                1.0,
                Color::WHITE,
                1.0,
            )
        })
        .collect();
    let links: Vec<Link> = topology
        .edges()
        .iter()
        .map(|e| Link {
            par1: e.end1.0 as u32,
            par2: e.end2.0 as u32,
            length: e.length,
            strength: e.value,
            color: [1.0; 4],
        })
        .collect();
    let field = ForceField::build(particles.len(), links, &[]);
    let params = SimParams {
        node_count: particles.len() as u32,
        link_count: field.links.len() as u32,
        dt: 0.02,
        damping: 0.9,
        repulsion: 1.0,
        spring_tension: 0.1,
        anchor_pull: 0.05,
        softening: 0.01,
    };
    (particles, field, params)
}

#[test]
fn test_gpu_matches_cpu() -> Result<()> {
    let Ok(mut gpu) = GpuBackend::new_blocking() else {
        eprintln!("no GPU adapter, skipping");
        return Ok(());
    };
    let (start, field, params) = fixture();

    let mut on_cpu = start.clone();
    CpuBackend::new().run_substeps(&mut on_cpu, &field, &params, 10)?;
    let mut on_gpu = start;
    gpu.run_substeps(&mut on_gpu, &field, &params, 10)?;

    for (c, g) in on_cpu.iter().zip(&on_gpu) {
        let diff = (c.position() - g.position()).length();
        assert!(diff < 1e-3, "cpu {:?} vs gpu {:?}", c.position, g.position);
    }
    Ok(())
}

#[test]
fn test_cpu_run_is_deterministic() -> Result<()> {
    let (start, field, params) = fixture();
    let mut a = start.clone();
    let mut b = start;
    CpuBackend::new().run_substeps(&mut a, &field, &params, 25)?;
    CpuBackend::new().run_substeps(&mut b, &field, &params, 25)?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn test_same_seed_same_layout() -> Result<()> {
    let topology = Topology::binary_tree(15);
    let mut a = cpu_engine(&topology, 11)?;
    let mut b = cpu_engine(&topology, 11)?;
    a.unpause();
    b.unpause();
    for _ in 0..5 {
        a.advance(&mut CommandQueue::new())?;
        b.advance(&mut CommandQueue::new())?;
    }
    assert_eq!(a.positions(), b.positions());
    Ok(())
}

#[test]
fn test_layout_contracts_from_initial_sphere() -> Result<()> {
    let topology = Topology::string(6);
    let mut engine = cpu_engine(&topology, 3)?;
    engine.unpause();
    let before = engine.positions()[0];
    for _ in 0..50 {
        engine.advance(&mut CommandQueue::new())?;
    }
    let after = engine.positions()[0];
    assert!(after.length().is_finite());
    assert_ne!(before, after);
    Ok(())
}

#[test]
fn test_snapshot_round_trips_through_layout_file() -> Result<()> {
    let topology = Topology::ring(5);
    let engine = cpu_engine(&topology, 9)?;
    let snapshot = engine.snapshot();

    let mut text = Vec::new();
    snapshot.write_layout(&mut text)?;
    let mut restored = Topology::ring(5);
    let placed = restored.read_layout_str(std::str::from_utf8(&text)?)?;
    assert_eq!(placed, 5);

    let mut reloaded =
        LayoutEngine::with_backend(LayoutConfig::default().cpu_only(), Box::new(CpuBackend::new()));
    reloaded.update_topology(&restored, &mut StdRng::seed_from_u64(0))?;
    for (a, b) in engine.positions().iter().zip(reloaded.positions()) {
        assert!((*a - b).length() < 1e-2);
    }
    Ok(())
}

#[test]
fn test_paint_rejects_unknown_edge() -> Result<()> {
    let mut engine = cpu_engine(&Topology::hub(2), 1)?;
    engine.paint_edges(&[EdgeId(0), EdgeId(1)], Color::GREEN)?;
    assert_eq!(engine.links()[0].color, Color::GREEN.to_array());
    let err = engine.paint_edges(&[EdgeId(2)], Color::RED).unwrap_err();
    assert!(matches!(err, LayoutError::InvalidGraph(_)));
    Ok(())
}

#[test]
fn test_merge_through_snapshot_keeps_particles() -> Result<()> {
    let mut engine = cpu_engine(&Topology::string(4), 2)?;
    let before = engine.particles().to_vec();
    engine.with_snapshot(|t| t.merge_nodes(NodeId(1), NodeId(2)))??;
    assert_eq!(engine.particles(), before.as_slice());
    assert_eq!(engine.links().len(), 3);
    Ok(())
}

//! Integration tests for the sgv CLI.
//!
//! Run with: `cargo test --package signal-graph-cli --test cli_integration`

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const NETWORK: &str = "\
EGFR\t1\t2\t+\t0\t1\t0
GRB2\t2\t3\t+\t0\t1\t0
SOS\t3\t4\t-\t1\t0\t0
RAS\t4\t5\tb\t0\t0\t1
RAF\t5\t\t\t0\t0\t1
";

/// Helper to run sgv in a specific directory.
fn run_sgv_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sgv"))
        .current_dir(dir)
        .env_remove("SIGNAL_GRAPH_CONFIG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute sgv command")
}

/// Write a network table and a CPU-only config; returns their paths.
fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let network = dir.join("network.tsv");
    fs::write(&network, NETWORK).unwrap();
    let config = dir.join("config.json");
    fs::write(
        &config,
        r#"{
            "layout": { "use_gpu": false, "iterations_per_frame": 4 },
            "inputs": ["EGFR"],
            "categories": [{ "members": ["RAS", "RAF"], "center": [0, 0, 0], "radius": 100 }],
            "propagation_interval_ms": 32
        }"#,
    )
    .unwrap();
    (network, config)
}

// =============================================================================
// Run Command Tests
// =============================================================================

#[test]
fn test_run_writes_named_layout() {
    let temp = TempDir::new().unwrap();
    let (network, config) = fixture(temp.path());

    let output = run_sgv_in_dir(
        temp.path(),
        &[
            "run",
            "--network",
            network.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--ticks",
            "4",
            "--output",
            "out.txt",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "sgv run should succeed: {output:?}");
    assert!(stdout.contains("📊 Network: 5 nodes, 4 interactions"));
    assert!(stdout.contains("⚡ Tick 3"));
    assert!(stdout.contains("✅ Run complete: 4 ticks"));

    let layout = fs::read_to_string(temp.path().join("out.txt")).unwrap();
    assert!(layout.starts_with("nodes:"));
    assert!(layout.contains("name:EGFR"));
    assert!(layout.contains("type:b"));
}

#[test]
fn test_run_resumes_from_saved_layout() {
    let temp = TempDir::new().unwrap();
    let (network, config) = fixture(temp.path());
    let args = |output: &'static str| {
        vec![
            "run".to_string(),
            "--network".into(),
            network.to_string_lossy().into_owned(),
            "--config".into(),
            config.to_string_lossy().into_owned(),
            "--ticks".into(),
            "1".into(),
            "--output".into(),
            output.into(),
        ]
    };

    let first: Vec<String> = args("first.txt");
    let refs: Vec<&str> = first.iter().map(String::as_str).collect();
    assert!(run_sgv_in_dir(temp.path(), &refs).status.success());

    let mut second = args("second.txt");
    second.extend(["--layout".to_string(), "first.txt".to_string()]);
    let refs: Vec<&str> = second.iter().map(String::as_str).collect();
    let output = run_sgv_in_dir(temp.path(), &refs);

    assert!(output.status.success(), "resume should succeed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("📍 Applied 5 saved positions"));
}

#[test]
fn test_run_rejects_unknown_input() {
    let temp = TempDir::new().unwrap();
    let (network, config) = fixture(temp.path());

    let output = run_sgv_in_dir(
        temp.path(),
        &[
            "run",
            "--network",
            network.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--input",
            "NOPE",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown input"), "stderr: {stderr}");
}

#[test]
fn test_run_rejects_malformed_network() {
    let temp = TempDir::new().unwrap();
    let (_, config) = fixture(temp.path());
    fs::write(temp.path().join("bad.tsv"), "EGFR\t1\t2\t+\n").unwrap();

    let output = run_sgv_in_dir(
        temp.path(),
        &["run", "--network", "bad.tsv", "--config", config.to_str().unwrap()],
    );

    assert!(!output.status.success());
    assert!(!temp.path().join("layout.txt").exists());
}

// =============================================================================
// Generate / Centrality Tests
// =============================================================================

#[test]
fn test_generate_ring() {
    let temp = TempDir::new().unwrap();
    let (_, config) = fixture(temp.path());

    let output = run_sgv_in_dir(
        temp.path(),
        &[
            "generate",
            "ring",
            "--nodes",
            "6",
            "--frames",
            "10",
            "--config",
            config.to_str().unwrap(),
            "--output",
            "ring.txt",
        ],
    );

    assert!(output.status.success(), "sgv generate should succeed: {output:?}");
    let layout = fs::read_to_string(temp.path().join("ring.txt")).unwrap();
    let edges = layout.split("edges:").nth(1).unwrap();
    assert_eq!(edges.lines().filter(|l| !l.trim().is_empty()).count(), 6);
}

#[test]
fn test_generate_quiet_prints_nothing() {
    let temp = TempDir::new().unwrap();
    let (_, config) = fixture(temp.path());

    let output = run_sgv_in_dir(
        temp.path(),
        &[
            "generate",
            "string",
            "--nodes",
            "4",
            "--frames",
            "2",
            "--quiet",
            "--config",
            config.to_str().unwrap(),
            "--output",
            "string.txt",
        ],
    );

    assert!(output.status.success(), "sgv generate should succeed: {output:?}");
    assert!(output.stdout.is_empty(), "stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert!(temp.path().join("string.txt").exists());
}

#[test]
fn test_centrality_ranks_middle_first() {
    let temp = TempDir::new().unwrap();
    let (network, _) = fixture(temp.path());

    let output = run_sgv_in_dir(
        temp.path(),
        &["centrality", "--network", network.to_str().unwrap(), "--top", "1"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("📈 Closeness centrality (5 nodes)"));
    assert!(stdout.contains("SOS"), "stdout: {stdout}");
    assert!(!stdout.contains("EGFR"));
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    let output = run_sgv_in_dir(temp.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for command in ["run", "generate", "centrality"] {
        assert!(stdout.contains(command));
    }
}

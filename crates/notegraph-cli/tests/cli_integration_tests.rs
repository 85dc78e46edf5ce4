//! CLI integration tests for notegraph
//!
//! Tests the notegraph CLI commands end-to-end using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create a command with an isolated config directory
#[allow(deprecated)]
fn notegraph_cmd(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("notegraph").unwrap();
    cmd.env("NOTEGRAPH_CONFIG_DIR", config_dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Graph file with three notes: Rust <-> Cargo -> Gardening
fn sample_graph(dir: &TempDir) -> PathBuf {
    let file = dir.path().join("graph.json");
    let config = dir.path().join("config");

    notegraph_cmd(&config)
        .args(["init"])
        .arg(&file)
        .args(["--name", "Research"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Graph created successfully"));

    for (title, body, tag) in [
        ("Rust", "Ownership borrowing lifetimes compiler", "rust"),
        ("Cargo", "Ownership borrowing crates compiler", "rust"),
        ("Gardening", "Tomatoes basil sunlight", "garden"),
    ] {
        notegraph_cmd(&config)
            .arg("add")
            .arg(&file)
            .args(["--title", title, "--body", body, "--tag", tag])
            .assert()
            .success();
    }

    notegraph_cmd(&config)
        .arg("connect")
        .arg(&file)
        .args(["Rust", "Cargo", "--bidirectional"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Connected 'Rust' -> 'Cargo'"));

    notegraph_cmd(&config)
        .arg("connect")
        .arg(&file)
        .args(["Cargo", "Gardening", "--type", "weak", "--weight", "0.2"])
        .assert()
        .success();

    file
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    notegraph_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("centrality"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);

    notegraph_cmd(dir.path())
        .arg("init")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_validate_and_stats() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);

    notegraph_cmd(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid (3 notes, 2 edges)"));

    let output = notegraph_cmd(dir.path())
        .args(["--format", "json", "stats"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["node_count"], 3);
    assert_eq!(stats["edge_count"], 2);
    assert_eq!(stats["bidirectional_edges"], 1);
    assert_eq!(stats["cluster_count"], 1);
    assert_eq!(stats["edges_by_type"]["weak"], 1);
}

#[test]
fn test_reload_publishes_only_new_events() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);

    notegraph_cmd(dir.path())
        .env("RUST_LOG", "notegraph=debug")
        .arg("add")
        .arg(&file)
        .args(["--title", "Compost"])
        .assert()
        .success()
        .stderr(predicate::str::contains("graph.node_added"))
        .stderr(predicate::str::contains("node.connected").not());

    notegraph_cmd(dir.path())
        .env("RUST_LOG", "notegraph=debug")
        .arg("connect")
        .arg(&file)
        .args(["Compost", "Gardening"])
        .assert()
        .success()
        .stderr(predicate::str::contains("node.connected"));
}

#[test]
fn test_path_follows_edges() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);

    notegraph_cmd(dir.path())
        .arg("path")
        .arg(&file)
        .args(["Rust", "Gardening"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rust -> Cargo -> Gardening"))
        .stdout(predicate::str::contains("(2 hops)"));

    notegraph_cmd(dir.path())
        .arg("path")
        .arg(&file)
        .args(["Gardening", "Rust"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No path"));
}

#[test]
fn test_connect_rejects_duplicates_and_self_loops() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);

    notegraph_cmd(dir.path())
        .arg("connect")
        .arg(&file)
        .args(["Rust", "Cargo"])
        .assert()
        .failure();

    notegraph_cmd(dir.path())
        .arg("connect")
        .arg(&file)
        .args(["Rust", "Rust"])
        .assert()
        .failure();

    notegraph_cmd(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 edges"));
}

#[test]
fn test_clusters_and_centrality() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);

    notegraph_cmd(dir.path())
        .arg("clusters")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 clusters"));

    // Every path between the outer notes then runs through Cargo.
    notegraph_cmd(dir.path())
        .arg("connect")
        .arg(&file)
        .args(["Gardening", "Cargo"])
        .assert()
        .success();

    notegraph_cmd(dir.path())
        .arg("centrality")
        .arg(&file)
        .args(["--top", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.000  Cargo"));
}

#[test]
fn test_suggest_skips_connected_notes() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("graph.json");
    let config = dir.path().join("config");

    notegraph_cmd(&config).arg("init").arg(&file).assert().success();
    for title in ["Rust ownership", "Rust borrowing ownership"] {
        notegraph_cmd(&config)
            .arg("add")
            .arg(&file)
            .args(["--title", title, "--tag", "rust"])
            .assert()
            .success();
    }

    notegraph_cmd(&config)
        .arg("suggest")
        .arg(&file)
        .arg("Rust ownership")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rust borrowing ownership"))
        .stdout(predicate::str::contains("shared tags: rust"));
}

#[test]
fn test_discover_apply_saves_edges() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("graph.json");
    let config = dir.path().join("config");

    notegraph_cmd(&config).arg("init").arg(&file).assert().success();
    for title in ["Graph traversal search", "Graph traversal search algorithms"] {
        notegraph_cmd(&config)
            .arg("add")
            .arg(&file)
            .args(["--title", title, "--tag", "graphs"])
            .assert()
            .success();
    }

    let output = notegraph_cmd(&config)
        .args(["--format", "json", "discover"])
        .arg(&file)
        .args(["Graph traversal search", "--apply"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let applied = result["applied"].as_u64().unwrap();
    assert!(applied >= 1);
    assert_eq!(result["candidates"].as_array().unwrap().len() as u64, applied);

    notegraph_cmd(&config)
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("2 notes, {} edges", applied)));
}

#[test]
fn test_nodes_pagination() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);

    let output = notegraph_cmd(dir.path())
        .args(["--format", "json", "nodes"])
        .arg(&file)
        .args(["--limit", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let page: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["has_more"], true);

    notegraph_cmd(dir.path())
        .arg("nodes")
        .arg(&file)
        .args(["--offset", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Notes 3-3 of 3"));
}

#[test]
fn test_invalid_snapshot_fails_validation() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);

    let json = std::fs::read_to_string(&file).unwrap();
    let mut snapshot: serde_json::Value = serde_json::from_str(&json).unwrap();
    snapshot["metadata"]["edge_count"] = serde_json::json!(7);
    std::fs::write(&file, serde_json::to_string(&snapshot).unwrap()).unwrap();

    notegraph_cmd(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("edge_count"));
}

#[test]
fn test_missing_file_reports_error() {
    let dir = TempDir::new().unwrap();

    notegraph_cmd(dir.path())
        .arg("stats")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read graph file"));
}

#[test]
fn test_config_set_get_list_reset() {
    let dir = TempDir::new().unwrap();

    notegraph_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    notegraph_cmd(dir.path())
        .args(["config", "set", "graph.max_connections_per_node", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set graph.max_connections_per_node = 7"));

    notegraph_cmd(dir.path())
        .args(["config", "get", "graph.max_connections_per_node"])
        .assert()
        .success()
        .stdout(predicate::str::diff("7\n"));

    notegraph_cmd(dir.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("discovery.strong_edge_threshold = 0.7"));

    notegraph_cmd(dir.path())
        .args(["config", "set", "graph.max_connections_per_node", "none"])
        .assert()
        .failure();

    notegraph_cmd(dir.path()).args(["config", "reset"]).assert().success();
    notegraph_cmd(dir.path())
        .args(["config", "get", "graph.max_connections_per_node"])
        .assert()
        .success()
        .stdout(predicate::str::diff("100\n"));
}

#[test]
fn test_configured_limits_apply_to_commands() {
    let dir = TempDir::new().unwrap();
    let file = sample_graph(&dir);
    let config = dir.path().join("config");

    notegraph_cmd(&config)
        .args(["config", "set", "graph.max_nodes_per_graph", "3"])
        .assert()
        .success();

    notegraph_cmd(&config)
        .arg("add")
        .arg(&file)
        .args(["--title", "One too many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nodes per graph"));
}

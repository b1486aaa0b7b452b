// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the vaxflow CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scenario network: one manufacturer, two recipients
const SCENARIO_JSON: &str = r#"{
    "recipients": [
        {"id": "A", "population": 100, "vaccination_rate": 0},
        {"id": "B", "population": 900, "vaccination_rate": 50}
    ],
    "manufacturers": [
        {"id": "M", "manufacturing_capacity": 1000000}
    ],
    "relations": [
        {"source": "A", "target": "B", "weight": 0.9}
    ]
}"#;

/// Command with an isolated environment
fn vaxflow(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vaxflow").expect("binary builds");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("VAXFLOW_CONFIG")
        .env_remove("VAXFLOW_AVAILABLE_SUPPLY");
    cmd
}

/// Write `content` to `dir/name` and return the path
fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Helper to get stdout as JSON
fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// =============================================================================
// validate
// =============================================================================

#[test]
fn test_validate_reports_counts() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);

    vaxflow(&dir)
        .arg("validate")
        .arg(&dataset)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 nodes (2 recipients, 1 manufacturers), 4 edges"));
}

#[test]
fn test_validate_fails_on_invalid_records() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(
        dir.path(),
        "bad.json",
        r#"{"recipients": [{"id": "X", "vaccination_rate": 10}]}"#,
    );

    vaxflow(&dir)
        .arg("validate")
        .arg(&dataset)
        .assert()
        .failure()
        .stdout(predicate::str::contains("rejected: "))
        .stderr(predicate::str::contains("1 invalid records"));
}

#[test]
fn test_strict_mode_aborts() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(
        dir.path(),
        "bad.json",
        r#"{"recipients": [{"id": "X"}], "manufacturers": [{"id": "M"}]}"#,
    );

    vaxflow(&dir)
        .args(["analyze", "--strict"])
        .arg(&dataset)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid dataset"));
}

#[test]
fn test_missing_dataset_fails() {
    let dir = TempDir::new().unwrap();

    vaxflow(&dir)
        .args(["analyze", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read dataset"));
}

// =============================================================================
// analyze / optimize / run
// =============================================================================

#[test]
fn test_analyze_json_output() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);

    let output = vaxflow(&dir)
        .args(["--json", "analyze"])
        .arg(&dataset)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["manufacturers"], serde_json::json!(["M"]));
    assert!(json["degree_centrality"]["A"].is_number());
}

#[test]
fn test_optimize_scenario_allocation() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);

    let output = vaxflow(&dir)
        .args(["--json", "optimize", "--supply", "500"])
        .arg(&dataset)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["allocation"]["status"], "OPTIMAL");
    let a = json["allocation"]["allocation"]["A"].as_f64().unwrap();
    let b = json["allocation"]["allocation"]["B"].as_f64().unwrap();
    assert!((a - 10.0).abs() < 1e-6);
    assert!((b - 90.0).abs() < 1e-6);

    let before = json["equity"]["before_gini"].as_f64().unwrap();
    let after = json["equity"]["after_gini"].as_f64().unwrap();
    assert!(after < before);
}

#[test]
fn test_optimize_negative_supply_reports_infeasible() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);

    vaxflow(&dir)
        .args(["optimize", "--supply=-1"])
        .arg(&dataset)
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: INFEASIBLE"));
}

#[test]
fn test_optimize_sample_negative_supply_reports_infeasible() {
    let dir = TempDir::new().unwrap();
    let dataset = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/sample_network.json");

    for supply in ["--supply=-1", "--supply=-inf"] {
        let output = vaxflow(&dir)
            .args(["--json", "optimize", supply])
            .arg(&dataset)
            .output()
            .unwrap();
        assert!(output.status.success());

        let json = stdout_json(&output);
        assert_eq!(json["allocation"]["status"], "INFEASIBLE");
        assert_eq!(json["allocation"]["allocation"], serde_json::json!({}));
    }
}

#[test]
fn test_run_writes_output_files() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);
    let out = dir.path().join("results");

    vaxflow(&dir)
        .arg("run")
        .arg(&dataset)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("NETWORK ANALYSIS"))
        .stdout(predicate::str::contains("Gini before"));

    let network: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("network_analysis.json")).unwrap())
            .unwrap();
    assert!(network["betweenness_centrality"].is_object());

    let optimization: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("optimization_results.json")).unwrap())
            .unwrap();
    assert_eq!(optimization["allocation"]["status"], "OPTIMAL");
}

#[test]
fn test_no_color_output_is_plain() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);

    vaxflow(&dir)
        .args(["--no-color", "run"])
        .arg(&dataset)
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[").not());
}

// =============================================================================
// export / config / completions
// =============================================================================

#[test]
fn test_export_dot() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);

    vaxflow(&dir)
        .arg("export")
        .arg(&dataset)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph supply {"))
        .stdout(predicate::str::contains("\"M\" -> \"A\""));
}

#[test]
fn test_export_json_to_file() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);
    let target = dir.path().join("graph.json");

    vaxflow(&dir)
        .args(["export", "--format", "json", "--output"])
        .arg(&target)
        .arg(&dataset)
        .assert()
        .success();

    let graph: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
}

#[test]
fn test_export_unknown_format() {
    let dir = TempDir::new().unwrap();
    let dataset = write_file(dir.path(), "net.json", SCENARIO_JSON);

    vaxflow(&dir)
        .args(["export", "--format", "yaml"])
        .arg(&dataset)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown export format"));
}

#[test]
fn test_config_layers_file_and_env() {
    let dir = TempDir::new().unwrap();
    let config = write_file(dir.path(), "vaxflow.toml", "available_supply = 1234.0\n");

    vaxflow(&dir)
        .arg("--config")
        .arg(&config)
        .args(["config", "available_supply"])
        .assert()
        .success()
        .stdout("1234.0\n");

    vaxflow(&dir)
        .arg("--config")
        .arg(&config)
        .env("VAXFLOW_AVAILABLE_SUPPLY", "99")
        .args(["config", "available_supply"])
        .assert()
        .success()
        .stdout("99.0\n");
}

#[test]
fn test_config_unknown_key() {
    let dir = TempDir::new().unwrap();

    vaxflow(&dir)
        .args(["config", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();

    vaxflow(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vaxflow"));
}

//! Integration tests for the `graphwright` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const CART_FLOW: &str = r#"{
    "state": {"type": "object", "properties": {"items": {"type": "array"}}},
    "nodes": [
        {"id": "browse", "is_start": true},
        {"id": "checkout", "is_end": true}
    ],
    "edges": [{"sources": ["browse"], "targets": ["checkout"]}]
}"#;

/// A command isolated from the user's configuration files.
fn graphwright(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("graphwright").unwrap();
    cmd.current_dir(workdir).env("HOME", workdir).env("NO_COLOR", "1").env_remove("GRAPHWRIGHT_ENGINE");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().unwrap();
    graphwright(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("predict"))
        .stdout(predicate::str::contains("score"));
}

#[test]
fn test_score_identical_graphs() {
    let temp_dir = TempDir::new().unwrap();
    let graph = temp_dir.path().join("graph.json");
    std::fs::write(&graph, CART_FLOW).unwrap();

    graphwright(temp_dir.path())
        .arg("score")
        .arg(&graph)
        .arg(&graph)
        .assert()
        .success()
        .stdout(predicate::str::contains("state match           1.000"))
        .stdout(predicate::str::contains("structure similarity  1.000"));
}

#[test]
fn test_score_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let predicted = temp_dir.path().join("predicted.json");
    let expected = temp_dir.path().join("expected.json");
    std::fs::write(&predicted, r#"{"nodes": [{"id": "browse"}], "edges": []}"#).unwrap();
    std::fs::write(&expected, CART_FLOW).unwrap();

    let output = graphwright(temp_dir.path())
        .arg("score")
        .arg(&predicted)
        .arg(&expected)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["nodes"]["precision"], 1.0);
    assert_eq!(report["nodes"]["recall"], 0.5);
    assert!(report["structure_similarity"].as_f64().unwrap() < 1.0);
}

#[test]
fn test_score_rejects_invalid_graph() {
    let temp_dir = TempDir::new().unwrap();
    let broken = temp_dir.path().join("broken.json");
    std::fs::write(&broken, r#"{"state": {}}"#).unwrap();

    graphwright(temp_dir.path())
        .arg("score")
        .arg(&broken)
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a valid graph"));
}

#[test]
fn test_predict_writes_one_line_per_input() {
    let temp_dir = TempDir::new().unwrap();
    let first = temp_dir.path().join("first.txt");
    let second = temp_dir.path().join("second.txt");
    std::fs::write(&first, "an agent that loops over tools").unwrap();
    std::fs::write(&second, "a two step pipeline").unwrap();
    let output = temp_dir.path().join("predictions.jsonl");

    graphwright(temp_dir.path())
        .env("GRAPHWRIGHT_ENGINE", "mock")
        .arg("predict")
        .arg(&first)
        .arg(&second)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("graphs predicted"));

    let written = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<serde_json::Value> = written.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["input"], first.display().to_string());
    assert_eq!(lines[1]["input"], second.display().to_string());
}

#[test]
fn test_predict_missing_input_fails() {
    let temp_dir = TempDir::new().unwrap();
    graphwright(temp_dir.path())
        .env("GRAPHWRIGHT_ENGINE", "mock")
        .arg("predict")
        .arg("missing.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read missing.txt"));
}

#[test]
fn test_create_reports_steps() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("docs.json");
    std::fs::write(&docs, r##"[{"source": "https://example.com/docs/", "content": "# StateGraph"}]"##).unwrap();

    graphwright(temp_dir.path())
        .env("GRAPHWRIGHT_DOCS_PATH", &docs)
        .arg("create")
        .arg("a counter graph")
        .arg("--engine")
        .arg("mock")
        .assert()
        .stderr(predicate::str::contains("Running step enter"));
}

#[test]
fn test_unknown_engine_fails() {
    let temp_dir = TempDir::new().unwrap();
    graphwright(temp_dir.path())
        .arg("create")
        .arg("a counter graph")
        .arg("--engine")
        .arg("telepathy")
        .assert()
        .failure();
}

#[test]
fn test_invalid_local_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join(".graphwrightrc"), "model = [").unwrap();

    graphwright(temp_dir.path())
        .arg("score")
        .arg("a.json")
        .arg("b.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

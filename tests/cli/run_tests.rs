use crate::common::{fixture, stubledger};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_run_passing_scenario() {
    let dir = TempDir::new().unwrap();
    stubledger(&dir)
        .arg("run")
        .arg(fixture("do_all.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenario: do all"))
        .stdout(predicate::str::contains("cell `value`: expected 11, got 11"))
        .stdout(predicate::str::contains("PASSED: 2 call(s) checked"));
}

#[test]
fn test_run_json_report() {
    let dir = TempDir::new().unwrap();
    let output = stubledger(&dir)
        .args(["run", "--format", "json"])
        .arg(fixture("do_all.toml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["name"], "do all");
    assert_eq!(report["steps"].as_array().unwrap().len(), 2);
    assert_eq!(report["calls"][0]["expectation"], 0);
    assert_eq!(report["calls"][0]["effects"], 3);
    assert!(report["calls"][1]["expectation"].is_null());
}

#[test]
fn test_run_reports_unsatisfied_expectation() {
    let dir = TempDir::new().unwrap();
    stubledger(&dir)
        .arg("run")
        .arg(fixture("unsatisfied.toml"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("expected at least 1 call, got 0"))
        .stderr(predicate::str::contains("Scenario failed"));
}

#[test]
fn test_run_missing_scenario_file() {
    let dir = TempDir::new().unwrap();
    stubledger(&dir)
        .args(["run", "/nonexistent/scenario.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read scenario file"));
}

#[test]
fn test_config_file_selects_json_format() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".stubledger.toml"),
        "[output]\nformat = \"json\"\n",
    )
    .unwrap();

    let output = stubledger(&dir)
        .arg("run")
        .arg(fixture("do_all.toml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(serde_json::from_slice::<serde_json::Value>(&output.stdout).is_ok());
}

#[test]
fn test_invalid_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".stubledger.toml"), "[unknown]\nkey = 1\n").unwrap();

    stubledger(&dir)
        .arg("run")
        .arg(fixture("do_all.toml"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Using defaults"));
}

use crate::common::{fixture, stubledger};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_check_valid_scenario() {
    let dir = TempDir::new().unwrap();
    stubledger(&dir)
        .arg("check")
        .arg(fixture("do_all.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "do all: 2 capabilities, 1 expectations, 2 calls",
        ));
}

#[test]
fn test_check_rejects_ambiguous_expectations() {
    let dir = TempDir::new().unwrap();
    stubledger(&dir)
        .arg("check")
        .arg(fixture("ambiguous.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("send"));
}

#[test]
fn test_check_rejects_malformed_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[[capabilities]\nname = ").unwrap();

    stubledger(&dir)
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse scenario TOML"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    stubledger(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}

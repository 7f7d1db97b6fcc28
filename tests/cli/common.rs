use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Path of a scenario under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// The binary, run from an empty directory with colors off.
pub fn stubledger(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stubledger").expect("Failed to find binary");
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("STUBLEDGER_LOG_JSON");
    cmd
}

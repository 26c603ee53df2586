//! End-to-end tests for the `lb` binary against a throwaway database.
//!
//! Each test gets its own HOME and config file, so nothing touches the real
//! user data directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn lb_binary() -> String {
    env!("CARGO_BIN_EXE_lb").to_string()
}

/// Temp home with a config file pointing the database inside it.
struct Sandbox {
    temp: TempDir,
    config: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        Self::with_config("")
    }

    fn with_config(extra: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("data").join("loopbreak.db");
        let config = temp.path().join("loopbreak.toml");
        std::fs::write(
            &config,
            format!("database_path = {:?}\n{extra}", db_path.display().to_string()),
        )
        .unwrap();
        Self { temp, config }
    }

    fn db_path(&self) -> PathBuf {
        self.temp.path().join("data").join("loopbreak.db")
    }

    fn home(&self) -> &Path {
        self.temp.path()
    }

    fn lb(&self, args: &[&str]) -> Output {
        Command::new(lb_binary())
            .env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.home().join(".config"))
            .env("XDG_DATA_HOME", self.home().join(".local/share"))
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .output()
            .expect("failed to run lb")
    }
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "lb should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_status_creates_database() {
    let sandbox = Sandbox::new();
    let out = stdout(&sandbox.lb(&["status"]));

    assert!(out.starts_with("LoopBreak status\n"));
    assert!(out.contains(&sandbox.db_path().display().to_string()));
    assert!(out.contains("No samples recorded."));
    assert!(sandbox.db_path().exists());
}

#[test]
fn test_summary_json_on_empty_log() {
    let sandbox = Sandbox::new();
    let out = stdout(&sandbox.lb(&["summary", "--day", "--json"]));

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["period"], "day");
    assert!(value["activity"].is_null());
}

#[test]
fn test_reports_on_empty_log() {
    let sandbox = Sandbox::new();

    let out = stdout(&sandbox.lb(&["forecast"]));
    assert_eq!(out, "Not enough history to forecast: 0 of 5 days recorded.\n");

    let out = stdout(&sandbox.lb(&["trends"]));
    assert!(out.contains("Not enough history: 0 of 3 days needed."));

    let out = stdout(&sandbox.lb(&["burnout"]));
    assert_eq!(out, "No samples in the last 6 hours; nothing assessed.\n");

    let out = stdout(&sandbox.lb(&["alerts"]));
    assert_eq!(out, "No alerts recorded.\n");
}

#[test]
fn test_check_on_empty_log_reports_nothing() {
    let sandbox = Sandbox::new();
    let out = stdout(&sandbox.lb(&["alerts", "--check", "threshold"]));
    assert_eq!(out, "[threshold] nothing to report.\n");
}

#[test]
fn test_reset_requires_confirmation() {
    let sandbox = Sandbox::new();

    let out = stdout(&sandbox.lb(&["reset"]));
    assert!(out.contains("Run 'lb reset --yes' to confirm."));

    let out = stdout(&sandbox.lb(&["reset", "--yes"]));
    assert!(out.starts_with("Deleted 0 samples.\n"));
}

#[test]
fn test_config_overrides_apply() {
    let sandbox = Sandbox::with_config("sample_interval_secs = 30\n");
    let out = stdout(&sandbox.lb(&["status"]));
    assert!(out.contains("Sampling every 30s"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let sandbox = Sandbox::with_config("sample_interval_secs = 0\n");
    let output = sandbox.lb(&["status"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sample_interval_secs"), "stderr: {stderr}");
}

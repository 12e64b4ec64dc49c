use assert_cmd::Command;
use chrono::{Duration, NaiveDate, Utc};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands against a throwaway database
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// A command running in the temp directory, so no stray `timeblock.toml`
    /// is picked up, with the database and wall clock pinned by environment.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("timeblock").expect("Failed to find timeblock binary");
        cmd.current_dir(self.temp_dir.path())
            .env("TIMEBLOCK_DATABASE_PATH", &self.db_path)
            .env("TIMEBLOCK_TIMEZONE", "UTC")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs `add` and returns the short ID it printed.
    pub fn add_block(&self, args: &[&str]) -> String {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let output = self.run_success(&full).get_output().stdout.clone();
        extract_id(&String::from_utf8_lossy(&output)).expect("add did not print an ID")
    }
}

/// Removes ANSI color sequences from captured output.
pub fn strip_ansi(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            plain.push(c);
        }
    }
    plain
}

pub fn extract_id(output: &str) -> Option<String> {
    strip_ansi(output)
        .lines()
        .find_map(|line| line.split("ID: ").nth(1))
        .map(|id| id.trim().to_string())
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `YYYY-MM-DD` for today plus `days`.
pub fn day(days: i64) -> String {
    (today() + Duration::days(days)).format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DDTHH:MM` on today plus `days`.
pub fn at(days: i64, time: &str) -> String {
    format!("{}T{}", day(days), time)
}

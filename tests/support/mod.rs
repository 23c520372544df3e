#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A board in a temp directory, pinned to UTC so calendar days are stable.
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    pub fn init() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join(".taskboard"))?;
        let board = Self { dir };
        board.write_config("[calendar]\nutc_offset = \"+00:00\"\n")?;
        Ok(board)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".taskboard.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join(".taskboard")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir().join("tasks.jsonl")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.state_dir().join("tasks.snapshot.json")
    }

    pub fn read_events(&self) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path)?;
        let mut events = Vec::new();
        for line in contents.lines().filter(|line| !line.trim().is_empty()) {
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }

    /// `taskboard` rooted at this board.
    pub fn cmd(&self) -> Command {
        let mut cmd = taskboard_cmd();
        cmd.current_dir(self.path());
        cmd
    }

    /// Run `args` with `--json` and return the envelope's `data`.
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output)?;
        Ok(value["data"].clone())
    }

    /// Create a task and return its id.
    pub fn add(&self, args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let data = self.json(&full)?;
        Ok(data["id"].as_str().ok_or("missing id")?.to_string())
    }
}

/// The binary with a clean environment.
pub fn taskboard_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taskboard").expect("binary");
    cmd.env_remove("TASKBOARD_ROOT")
        .env_remove("TASKBOARD_USER")
        .env_remove("RUST_LOG");
    cmd
}

pub fn ids(tasks: &Value) -> Vec<String> {
    tasks
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|task| task["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

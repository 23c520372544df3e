//! Storage layer for taskboard
//!
//! All state lives under the board root:
//!
//! ```text
//! <root>/
//!   .taskboard.toml               # Board configuration
//!   .taskboard/
//!     tasks.jsonl                 # Append-only task event log
//!     tasks.snapshot.json         # Materialized snapshot (rebuildable)
//!     user                        # Persisted user identity
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock;

/// Name of the board-local state directory
pub const STATE_DIR: &str = ".taskboard";

const TASKS_LOG: &str = "tasks.jsonl";
const TASKS_SNAPSHOT: &str = "tasks.snapshot.json";
const USER_FILE: &str = "user";

/// Storage manager for board state
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the nearest ancestor of `start` holding a `.taskboard/`
    /// directory, falling back to `start` itself.
    pub fn discover(start: &Path) -> Self {
        let found = start
            .ancestors()
            .find(|dir| dir.join(STATE_DIR).is_dir())
            .unwrap_or(start);
        Self::new(found)
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_dir().join(TASKS_LOG)
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.state_dir().join(TASKS_SNAPSHOT)
    }

    pub fn user_file(&self) -> PathBuf {
        self.state_dir().join(USER_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(crate::config::CONFIG_FILE)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Create `.taskboard/` and an empty event log. Idempotent.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.state_dir())?;
        let log = self.log_file();
        if !log.exists() {
            File::create(&log)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state_dir().is_dir()
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write pretty JSON atomically.
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Append one record as a JSON line. Callers hold the log lock.
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(record)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{json}")?;
        file.sync_all()?;
        Ok(())
    }

    /// Read every record of a JSONL file; a missing file reads as empty.
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|err| {
                Error::OperationFailed(format!(
                    "{}:{}: malformed record: {err}",
                    path.display(),
                    idx + 1
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    // =========================================================================
    // User identity persistence
    // =========================================================================

    pub fn read_user(&self) -> Option<String> {
        fs::read_to_string(self.user_file())
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn write_user(&self, email: &str) -> Result<()> {
        fs::create_dir_all(self.state_dir())?;
        lock::write_atomic(self.user_file(), format!("{email}\n").as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: u32,
        name: String,
    }

    #[test]
    fn paths_live_under_state_dir() {
        let storage = Storage::new("/board");
        assert_eq!(storage.state_dir(), PathBuf::from("/board/.taskboard"));
        assert_eq!(
            storage.log_file(),
            PathBuf::from("/board/.taskboard/tasks.jsonl")
        );
        assert_eq!(
            storage.snapshot_file(),
            PathBuf::from("/board/.taskboard/tasks.snapshot.json")
        );
        assert_eq!(storage.config_file(), PathBuf::from("/board/.taskboard.toml"));
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        assert!(!storage.is_initialized());

        storage.init().unwrap();
        storage.init().unwrap();
        assert!(storage.is_initialized());
        assert!(storage.log_file().exists());
    }

    #[test]
    fn jsonl_round_trip_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let path = storage.log_file();

        storage
            .append_jsonl(&path, &Row { id: 1, name: "a".to_string() })
            .unwrap();
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file).unwrap();
        storage
            .append_jsonl(&path, &Row { id: 2, name: "b".to_string() })
            .unwrap();

        let rows: Vec<Row> = storage.read_jsonl(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "b");
    }

    #[test]
    fn malformed_jsonl_reports_line() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        storage.init().unwrap();
        fs::write(storage.log_file(), "{\"id\":1,\"name\":\"a\"}\nnot json\n").unwrap();

        let err = storage.read_jsonl::<Row>(&storage.log_file()).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }

    #[test]
    fn discover_walks_up_to_board_root() {
        let dir = TempDir::new().unwrap();
        Storage::new(dir.path()).init().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let storage = Storage::discover(&nested);
        assert_eq!(storage.root(), dir.path());
    }

    #[test]
    fn user_identity_persists() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        assert!(storage.read_user().is_none());

        storage.write_user("alice@example.com").unwrap();
        assert_eq!(storage.read_user().as_deref(), Some("alice@example.com"));
    }
}

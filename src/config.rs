//! Configuration loading and management
//!
//! Handles parsing of `.taskboard.toml` configuration files. A user-level
//! `config.toml` in the platform config directory is used when the board
//! root has none.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Priority, Status};

/// File name of the board-level config.
pub const CONFIG_FILE: &str = ".taskboard.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task defaults and id format
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Calendar-day bucketing
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Default user identity
    #[serde(default)]
    pub user: UserConfig,
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Board-wide task ID prefix
    #[serde(default = "default_task_id_prefix")]
    pub id_prefix: String,

    /// Minimum task ID suffix length
    #[serde(default = "default_task_id_min_len")]
    pub id_min_len: usize,

    /// Priority for new tasks
    #[serde(default = "default_task_priority")]
    pub default_priority: Priority,

    /// Status for new tasks
    #[serde(default = "default_task_status")]
    pub default_status: Status,
}

fn default_task_id_prefix() -> String {
    "tb".to_string()
}

fn default_task_id_min_len() -> usize {
    3
}

fn default_task_priority() -> Priority {
    Priority::Medium
}

fn default_task_status() -> Status {
    Status::Todo
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_task_id_prefix(),
            id_min_len: default_task_id_min_len(),
            default_priority: default_task_priority(),
            default_status: default_task_status(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Fixed UTC offset for calendar days (e.g. "+02:00"). Unset means the
    /// local system offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,
}

impl CalendarConfig {
    /// Resolve the offset used to turn timestamps into calendar days.
    pub fn offset(&self) -> Result<FixedOffset> {
        match self.utc_offset.as_deref() {
            Some(raw) => parse_utc_offset(raw),
            None => Ok(Local::now().offset().fix()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Email recorded as owner when no other identity is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Parse `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| Error::InvalidConfig("calendar.utc_offset out of range".to_string()));
    }

    let invalid = || {
        Error::InvalidConfig(format!(
            "calendar.utc_offset: invalid offset '{trimmed}' (expected +HH:MM)"
        ))
    };

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    if !rest.is_ascii() {
        return Err(invalid());
    }
    let (hh, mm) = match rest.len() {
        5 if rest.as_bytes()[2] == b':' => (&rest[..2], &rest[3..]),
        4 => (&rest[..2], &rest[2..]),
        _ => return Err(invalid()),
    };
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = hh.parse().map_err(|_| invalid())?;
    let minutes: i32 = mm.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration for a board root, or return defaults.
    ///
    /// Order: `<root>/.taskboard.toml`, then the user-level config file.
    /// An unreadable or invalid file yields defaults.
    pub fn load_from_root(root: &Path) -> Self {
        let board_path = root.join(CONFIG_FILE);
        if board_path.exists() {
            return match Self::load(&board_path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(path = %board_path.display(), error = %err, "ignoring invalid config");
                    Self::default()
                }
            };
        }

        if let Some(user_path) = user_config_path() {
            if user_path.exists() {
                return Self::load(&user_path).unwrap_or_default();
            }
        }

        Self::default()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.tasks.validate()?;
        if let Some(raw) = self.calendar.utc_offset.as_deref() {
            parse_utc_offset(raw)?;
        }
        if let Some(email) = self.user.email.as_deref() {
            crate::task::validate_email(email).map_err(|_| {
                Error::InvalidConfig(format!("user.email: invalid email address '{email}'"))
            })?;
        }
        Ok(())
    }
}

impl TasksConfig {
    fn validate(&self) -> Result<()> {
        let prefix = self.id_prefix.trim();
        if prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "tasks.id_prefix cannot be empty".to_string(),
            ));
        }
        if !prefix.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(Error::InvalidConfig(
                "tasks.id_prefix must be alphanumeric".to_string(),
            ));
        }
        if self.id_min_len < 3 {
            return Err(Error::InvalidConfig(
                "tasks.id_min_len must be >= 3".to_string(),
            ));
        }
        if self.id_min_len > 16 {
            return Err(Error::InvalidConfig(
                "tasks.id_min_len must be <= 16".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path of the user-level config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "taskboard")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

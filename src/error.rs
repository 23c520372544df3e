//! Error types for taskboard
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, bad config)
//! - 4: Operation failed (io, serialization, lock timeout, watcher)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskboard CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskboard operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_) | Error::InvalidArgument(_) | Error::TaskNotFound(_) => {
                exit_codes::USER_ERROR
            }

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Watch(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details attached to JSON error output, when any apply.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskNotFound(id) => Some(serde_json::json!({ "id": id })),
            Error::LockFailed(path) => Some(serde_json::json!({ "lock": path })),
            _ => None,
        }
    }
}

/// Result type alias for taskboard operations
pub type Result<T> = std::result::Result<T, Error>;

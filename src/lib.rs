//! taskboard - task board library
//!
//! This library provides the core functionality for the taskboard CLI: a
//! file-backed task store and the pure views derived from its snapshots.
//!
//! # Core Concepts
//!
//! - **Tasks**: title, description, status, priority, optional due date,
//!   owner, share list and tags
//! - **Snapshots**: versioned, immutable copies of the task list
//! - **Derived views**: filtered lists, board columns, stats, due-date
//!   alerts and calendar days, all recomputable from a snapshot
//!
//! # Module Organization
//!
//! - `task`: Task model and boundary validation
//! - `store`: Event-sourced task store with versioned snapshots
//! - `filter`: Status, priority and search filtering
//! - `alerts`: Due-date notifications
//! - `calendar`: Calendar-day index of due dates
//! - `board`: Status columns and counts
//! - `views`: Combined derived views and memoization
//! - `watch`: Filesystem change notification
//! - `user`: Current user identity
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskboard.toml`
//! - `error`: Error types and result aliases
//! - `storage`: Board directory layout and file I/O
//! - `lock`: File locking and atomic writes

pub mod alerts;
pub mod board;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod lock;
pub mod output;
pub mod storage;
pub mod store;
pub mod task;
pub mod user;
pub mod views;
pub mod watch;

pub use alerts::{derive_notifications, Alert, AlertKind};
pub use calendar::{dates_with_tasks, tasks_for_date, CalendarIndex};
pub use error::{Error, Result};
pub use filter::{filter_tasks, visible_to, PriorityFilter, StatusFilter, TaskFilter};
pub use store::{Snapshot, TaskStore};
pub use task::{NewTask, Priority, Status, Task, TaskPatch};

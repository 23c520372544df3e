//! Shared command plumbing: board discovery, store setup, argument parsing.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputOptions;
use crate::storage::Storage;
use crate::store::TaskStore;
use crate::task::Task;
use crate::user::{self, User};

/// Flags accepted by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub root: Option<PathBuf>,
    pub user: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalArgs {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

pub struct BoardContext {
    pub store: TaskStore,
    pub config: Config,
    pub user: Option<User>,
    pub offset: FixedOffset,
}

impl BoardContext {
    pub fn user_email(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.email.as_str())
    }

    /// Resolve a task id argument against the current snapshot.
    pub fn resolve(&self, id: &str) -> Result<String> {
        self.store.resolve_id(id)
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Board root: `--root`, else the nearest ancestor holding `.taskboard/`,
/// else the current directory.
pub fn board_storage(root: Option<&PathBuf>) -> Result<Storage> {
    match root {
        Some(root) => Ok(Storage::new(root.clone())),
        None => Ok(Storage::discover(&std::env::current_dir()?)),
    }
}

pub fn load_context(global: &GlobalArgs) -> Result<BoardContext> {
    let storage = board_storage(global.root.as_ref())?;
    let config = Config::load_from_root(storage.root());
    let offset = config.calendar.offset()?;
    let user = user::resolve_user(&storage, &config, global.user.as_deref())?;
    let store = TaskStore::new(storage, config.tasks.clone())
        .with_actor(user.as_ref().map(|user| user.email.clone()));
    tracing::debug!(
        root = %store.storage().root().display(),
        user = user.as_ref().map(|u| u.email.as_str()).unwrap_or("-"),
        offset = %offset,
        "loaded board"
    );

    Ok(BoardContext {
        store,
        config,
        user,
        offset,
    })
}

/// Parse a due date: `YYYY-MM-DD` is midnight at `offset`, otherwise RFC 3339.
pub fn parse_due(value: &str, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return offset
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| Error::InvalidArgument(format!("invalid due date '{trimmed}'")));
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| {
            Error::InvalidArgument(format!(
                "invalid due date '{trimmed}' (expected YYYY-MM-DD or RFC 3339): {err}"
            ))
        })
}

/// Parse `--now`, re-expressed at the calendar offset.
pub fn parse_now(value: Option<&str>, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let Some(value) = value else {
        return Ok(Utc::now().with_timezone(&offset));
    };
    let parsed = DateTime::parse_from_rfc3339(value.trim()).map_err(|err| {
        Error::InvalidArgument(format!("invalid --now timestamp '{value}': {err}"))
    })?;
    Ok(parsed.with_timezone(&offset))
}

pub fn parse_date(label: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidArgument(format!("invalid {label} '{value}' (expected YYYY-MM-DD)"))
    })
}

/// One-line task rendering used by list-style output.
pub fn task_line(task: &Task, offset: FixedOffset) -> String {
    let mut line = format!(
        "{} [{}] [{}] {}",
        task.id, task.status, task.priority, task.title
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!(
            " (due {})",
            due.with_timezone(&offset).date_naive()
        ));
    }
    if !task.tags.is_empty() {
        line.push_str(&format!(" #{}", task.tags.join(" #")));
    }
    line
}

//! Task store.
//!
//! Tasks are stored as append-only events in `.taskboard/tasks.jsonl` and
//! materialized into a versioned snapshot in `.taskboard/tasks.snapshot.json`.
//! The snapshot's `version` is the number of events applied; a snapshot that
//! disagrees with the log is discarded and rebuilt by replay.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::config::TasksConfig;
use crate::error::{Error, Result};
use crate::lock::{lock_path_for, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::Storage;
use crate::task::{self, NewTask, Priority, Status, Task, TaskPatch};

const SNAPSHOT_SCHEMA_VERSION: &str = "taskboard.tasks.v1";
const TASK_ID_DELIM: char = '-';
const ULID_TIME_LEN: usize = 10;
const ULID_RANDOM_LEN: usize = 16;
const ULID_CHARSET: &str = "0123456789abcdefghjkmnpqrstvwxyz";
const ULID_CHARSET_LEN: u128 = 32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventType {
    TaskCreated,
    TaskEdited,
    TaskStatusChanged,
    TaskShared,
    TaskUnshared,
    TaskTagged,
    TaskUntagged,
    TaskDeleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub event_id: String,
    pub task_id: String,
    #[serde(rename = "type")]
    pub event_type: TaskEventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_due_date: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TaskEvent {
    pub fn new(event_type: TaskEventType, task_id: impl Into<String>) -> Self {
        Self {
            event_id: Ulid::new().to_string(),
            task_id: task_id.into(),
            event_type,
            timestamp: Utc::now(),
            actor: None,
            title: None,
            description: None,
            priority: None,
            status: None,
            due_date: None,
            clear_due_date: false,
            emails: Vec::new(),
            tags: Vec::new(),
        }
    }
}

/// Immutable, versioned copy of the task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: String,
    pub version: u64,
    pub generated_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            version: 0,
            generated_at: Utc::now(),
            tasks: Vec::new(),
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    /// Replay events in log order.
    pub fn replay(events: &[TaskEvent]) -> Result<Self> {
        let mut snapshot = Self::empty();
        for event in events {
            snapshot.apply(event)?;
        }
        Ok(snapshot)
    }

    /// Apply one event, bumping the version.
    pub fn apply(&mut self, event: &TaskEvent) -> Result<()> {
        apply_event(&mut self.tasks, event)?;
        self.version += 1;
        self.generated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    storage: Storage,
    config: TasksConfig,
    actor: Option<String>,
}

impl TaskStore {
    pub fn new(storage: Storage, config: TasksConfig) -> Self {
        Self {
            storage,
            config,
            actor: None,
        }
    }

    /// Record `actor` on every event this store writes.
    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &TasksConfig {
        &self.config
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current snapshot. Falls back to replaying the log when the snapshot
    /// file is missing, unreadable, or behind the log.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let log_len = self.log_event_count()?;
        let path = self.storage.snapshot_file();
        if path.exists() {
            match self.storage.read_json::<Snapshot>(&path) {
                Ok(snapshot)
                    if snapshot.schema_version == SNAPSHOT_SCHEMA_VERSION
                        && snapshot.version == log_len =>
                {
                    return Ok(snapshot);
                }
                Ok(snapshot) => {
                    tracing::debug!(
                        snapshot_version = snapshot.version,
                        log_len,
                        "snapshot out of date, replaying log"
                    );
                }
                Err(err) => {
                    tracing::warn!(error = %err, "unreadable snapshot, replaying log");
                }
            }
        }
        self.replay_log()
    }

    pub fn list(&self) -> Result<Vec<Task>> {
        Ok(self.snapshot()?.tasks)
    }

    pub fn get(&self, task_id: &str) -> Result<Task> {
        self.snapshot()?
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    pub fn events(&self) -> Result<Vec<TaskEvent>> {
        self.storage.read_jsonl(&self.storage.log_file())
    }

    /// Resolve a full id, a suffix, or a unique suffix prefix.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let snapshot = self.snapshot()?;
        resolve_task_id(&snapshot.tasks, input)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn create(&self, input: NewTask) -> Result<Task> {
        let input = input.normalized()?;
        let (snapshot, event) = self.commit(|snapshot| {
            let issued = self.issued_task_ids(snapshot)?;
            let task_id = self.generate_task_id(&issued);
            let mut event = TaskEvent::new(TaskEventType::TaskCreated, task_id);
            event.title = Some(input.title.clone());
            event.description = Some(input.description.clone());
            event.priority = Some(input.priority);
            event.status = Some(input.status);
            event.due_date = input.due_date;
            event.emails = input.shared_with.clone();
            event.tags = input.tags.clone();
            Ok(Some(event))
        })?;
        let task_id = event.map(|event| event.task_id).unwrap_or_default();
        task_after(&snapshot, &task_id)
    }

    pub fn edit(&self, task_id: &str, patch: TaskPatch) -> Result<Task> {
        if patch.is_empty() {
            return Err(Error::InvalidArgument("nothing to edit".to_string()));
        }
        let title = patch
            .title
            .as_deref()
            .map(task::normalize_title)
            .transpose()?;
        let (snapshot, _) = self.commit(|snapshot| {
            require_task(snapshot, task_id)?;
            let mut event = TaskEvent::new(TaskEventType::TaskEdited, task_id);
            event.title = title.clone();
            event.description = patch.description.as_deref().map(|d| d.trim().to_string());
            event.priority = patch.priority;
            match patch.due_date {
                Some(Some(due)) => event.due_date = Some(due),
                Some(None) => event.clear_due_date = true,
                None => {}
            }
            Ok(Some(event))
        })?;
        task_after(&snapshot, task_id)
    }

    /// Set status. Any transition is allowed; setting the current status
    /// records nothing.
    pub fn set_status(&self, task_id: &str, status: Status) -> Result<Task> {
        let (snapshot, _) = self.commit(|snapshot| {
            let task = require_task(snapshot, task_id)?;
            if task.status == status {
                return Ok(None);
            }
            let mut event = TaskEvent::new(TaskEventType::TaskStatusChanged, task_id);
            event.status = Some(status);
            Ok(Some(event))
        })?;
        task_after(&snapshot, task_id)
    }

    /// Share with additional emails; already-present addresses are skipped.
    pub fn share(&self, task_id: &str, emails: &[String]) -> Result<Task> {
        for email in emails.iter().filter(|email| !email.trim().is_empty()) {
            task::validate_email(email)?;
        }
        self.list_change(task_id, TaskEventType::TaskShared, |task| {
            let mut draft = task.clone();
            draft.share_with(emails)
        })
    }

    pub fn unshare(&self, task_id: &str, emails: &[String]) -> Result<Task> {
        self.list_change(task_id, TaskEventType::TaskUnshared, |task| {
            let mut draft = task.clone();
            draft.unshare(emails)
        })
    }

    pub fn tag(&self, task_id: &str, tags: &[String]) -> Result<Task> {
        self.list_change(task_id, TaskEventType::TaskTagged, |task| {
            let mut draft = task.clone();
            draft.add_tags(tags)
        })
    }

    pub fn untag(&self, task_id: &str, tags: &[String]) -> Result<Task> {
        self.list_change(task_id, TaskEventType::TaskUntagged, |task| {
            let mut draft = task.clone();
            draft.remove_tags(tags)
        })
    }

    /// Delete a task, returning its last state.
    pub fn delete(&self, task_id: &str) -> Result<Task> {
        let mut removed = None;
        self.commit(|snapshot| {
            removed = Some(require_task(snapshot, task_id)?.clone());
            Ok(Some(TaskEvent::new(TaskEventType::TaskDeleted, task_id)))
        })?;
        removed.ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    /// Replay the log and rewrite the snapshot.
    pub fn rebuild(&self) -> Result<Snapshot> {
        let lock_path = lock_path_for(&self.storage.log_file());
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;
        let snapshot = self.replay_log()?;
        self.storage
            .write_json(&self.storage.snapshot_file(), &snapshot)?;
        Ok(snapshot)
    }

    fn list_change<F>(&self, task_id: &str, event_type: TaskEventType, delta: F) -> Result<Task>
    where
        F: Fn(&Task) -> Vec<String>,
    {
        let (snapshot, _) = self.commit(|snapshot| {
            let task = require_task(snapshot, task_id)?;
            let changed = delta(task);
            if changed.is_empty() {
                return Ok(None);
            }
            let mut event = TaskEvent::new(event_type, task_id);
            match event_type {
                TaskEventType::TaskShared | TaskEventType::TaskUnshared => event.emails = changed,
                _ => event.tags = changed,
            }
            Ok(Some(event))
        })?;
        task_after(&snapshot, task_id)
    }

    /// Build an event against the current snapshot and persist it, all
    /// under the log lock. `build` returning `None` records nothing.
    fn commit<F>(&self, build: F) -> Result<(Snapshot, Option<TaskEvent>)>
    where
        F: FnOnce(&Snapshot) -> Result<Option<TaskEvent>>,
    {
        self.storage.init()?;
        let log_path = self.storage.log_file();
        let _lock = FileLock::acquire(lock_path_for(&log_path), DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut snapshot = self.snapshot()?;
        let Some(mut event) = build(&snapshot)? else {
            return Ok((snapshot, None));
        };
        event.actor = self.actor.clone();

        snapshot.apply(&event)?;
        self.storage.append_jsonl(&log_path, &event)?;
        self.storage
            .write_json(&self.storage.snapshot_file(), &snapshot)?;
        tracing::debug!(
            task_id = %event.task_id,
            event = ?event.event_type,
            version = snapshot.version,
            "task event committed"
        );
        Ok((snapshot, Some(event)))
    }

    fn replay_log(&self) -> Result<Snapshot> {
        let events = self.events()?;
        tracing::debug!(events = events.len(), "replaying task log");
        Snapshot::replay(&events)
    }

    fn log_event_count(&self) -> Result<u64> {
        let path = self.storage.log_file();
        if !path.exists() {
            return Ok(0);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(content.lines().filter(|line| !line.trim().is_empty()).count() as u64)
    }

    /// Every id ever handed out: live tasks plus deleted ones still in the log.
    fn issued_task_ids(&self, snapshot: &Snapshot) -> Result<Vec<String>> {
        let mut ids: Vec<String> = snapshot.tasks.iter().map(|task| task.id.clone()).collect();
        ids.extend(
            self.events()?
                .into_iter()
                .filter(|event| event.event_type == TaskEventType::TaskCreated)
                .map(|event| event.task_id),
        );
        Ok(ids)
    }

    fn generate_task_id(&self, issued: &[String]) -> String {
        let prefix = self.config.id_prefix.trim();
        let mut existing_suffixes = HashSet::new();
        let mut suffix_counts: HashMap<usize, usize> = HashMap::new();
        for id in issued {
            let id_norm = normalize_id(id);
            let suffix = suffix_from_id(&id_norm);
            if suffix.is_empty() {
                continue;
            }
            if !existing_suffixes.insert(suffix.to_string()) {
                continue;
            }
            if suffix.chars().all(|ch| ULID_CHARSET.contains(ch)) {
                *suffix_counts.entry(suffix.len()).or_insert(0) += 1;
            }
        }

        let target_len = select_suffix_len(self.config.id_min_len, &suffix_counts);
        loop {
            let base = Ulid::new().to_string();
            if let Some(suffix) = suffix_from_ulid(&base, target_len, &existing_suffixes) {
                return format!("{prefix}{TASK_ID_DELIM}{suffix}");
            }
        }
    }
}

fn require_task<'a>(snapshot: &'a Snapshot, task_id: &str) -> Result<&'a Task> {
    snapshot
        .get(task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
}

fn task_after(snapshot: &Snapshot, task_id: &str) -> Result<Task> {
    require_task(snapshot, task_id).cloned()
}

fn apply_event(tasks: &mut Vec<Task>, event: &TaskEvent) -> Result<()> {
    if event.event_type == TaskEventType::TaskCreated {
        if tasks.iter().any(|task| task.id == event.task_id) {
            return Err(Error::InvalidArgument(format!(
                "task already exists: {}",
                event.task_id
            )));
        }
        let title = event.title.clone().ok_or_else(|| {
            Error::InvalidArgument(format!("missing title for {}", event.task_id))
        })?;
        let mut task = Task {
            id: event.task_id.clone(),
            title,
            description: event.description.clone().unwrap_or_default(),
            priority: event.priority.unwrap_or(Priority::Medium),
            status: event.status.unwrap_or(Status::Todo),
            due_date: event.due_date,
            created_at: event.timestamp,
            updated_at: event.timestamp,
            owner: event.actor.clone(),
            shared_with: Vec::new(),
            tags: Vec::new(),
        };
        task.share_with(&event.emails);
        task.add_tags(&event.tags);
        tasks.push(task);
        return Ok(());
    }

    let idx = tasks
        .iter()
        .position(|task| task.id == event.task_id)
        .ok_or_else(|| Error::TaskNotFound(event.task_id.clone()))?;

    if event.event_type == TaskEventType::TaskDeleted {
        tasks.remove(idx);
        return Ok(());
    }

    let task = &mut tasks[idx];
    match event.event_type {
        TaskEventType::TaskEdited => {
            if let Some(title) = event.title.as_ref() {
                task.title = title.clone();
            }
            if let Some(description) = event.description.as_ref() {
                task.description = description.clone();
            }
            if let Some(priority) = event.priority {
                task.priority = priority;
            }
            if event.clear_due_date {
                task.due_date = None;
            } else if let Some(due) = event.due_date {
                task.due_date = Some(due);
            }
        }
        TaskEventType::TaskStatusChanged => {
            task.status = event.status.ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "status missing for task event {}",
                    event.event_id
                ))
            })?;
        }
        TaskEventType::TaskShared => {
            task.share_with(&event.emails);
        }
        TaskEventType::TaskUnshared => {
            task.unshare(&event.emails);
        }
        TaskEventType::TaskTagged => {
            task.add_tags(&event.tags);
        }
        TaskEventType::TaskUntagged => {
            task.remove_tags(&event.tags);
        }
        TaskEventType::TaskCreated | TaskEventType::TaskDeleted => {}
    }
    task.updated_at = event.timestamp;
    Ok(())
}

fn resolve_task_id(tasks: &[Task], input: &str) -> Result<String> {
    let trimmed = input.trim();
    let trimmed_norm = normalize_id(trimmed);
    let candidate = suffix_from_id(&trimmed_norm);
    if candidate.is_empty() {
        return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
    }

    let mut exact = Vec::new();
    let mut prefixed = Vec::new();
    for task in tasks {
        let id_norm = normalize_id(&task.id);
        let suffix = suffix_from_id(&id_norm);
        if id_norm == trimmed_norm || suffix == trimmed_norm {
            exact.push(task.id.clone());
        } else if suffix.starts_with(candidate) {
            prefixed.push(task.id.clone());
        }
    }

    let matches = if exact.is_empty() { prefixed } else { exact };
    match matches.len() {
        0 => Err(Error::TaskNotFound(trimmed.to_string())),
        1 => Ok(matches[0].clone()),
        _ => Err(Error::InvalidArgument(format!(
            "ambiguous task id '{}': {}",
            trimmed,
            matches.join(", ")
        ))),
    }
}

fn normalize_id(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

fn suffix_from_id(id_norm: &str) -> &str {
    match id_norm.split_once(TASK_ID_DELIM) {
        Some((_, suffix)) => suffix,
        None => id_norm,
    }
}

/// Take `len` chars from the random section of a ULID, unless taken.
fn suffix_from_ulid(base: &str, len: usize, existing: &HashSet<String>) -> Option<String> {
    let base = base.to_lowercase();
    let random_end = ULID_TIME_LEN + ULID_RANDOM_LEN;
    if base.len() < random_end || len == 0 || len > ULID_RANDOM_LEN {
        return None;
    }
    let candidate = &base[ULID_TIME_LEN..ULID_TIME_LEN + len];
    if existing.contains(candidate) {
        return None;
    }
    Some(candidate.to_string())
}

/// Grow the suffix length once every suffix of the current length is used.
fn select_suffix_len(min_len: usize, counts: &HashMap<usize, usize>) -> usize {
    let mut len = min_len;
    while len < ULID_RANDOM_LEN {
        let used = counts.get(&len).copied().unwrap_or(0) as u128;
        if used < ULID_CHARSET_LEN.pow(len as u32) {
            break;
        }
        len += 1;
    }
    len
}

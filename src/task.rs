//! Task model.
//!
//! A [`Task`] is the only entity on the board. Mutation-boundary rules
//! (trimmed non-empty titles, deduplicated tags and share lists) live here so
//! the store and the CLI apply them the same way.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Workflow status. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
        }
    }

    /// Column heading used by the board.
    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Status::Todo),
            "in-progress" | "in_progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            other => Err(Error::InvalidArgument(format!(
                "unknown task status '{other}' (expected todo|in-progress|completed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::InvalidArgument(format!(
                "unknown task priority '{other}' (expected low|medium|high)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub shared_with: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Task {
    pub fn is_shared(&self) -> bool {
        !self.shared_with.is_empty()
    }

    /// Add emails not already present. Returns the ones actually added.
    pub fn share_with<I, S>(&mut self, emails: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_unique(&mut self.shared_with, emails)
    }

    /// Remove emails. Returns the ones actually removed.
    pub fn unshare<I, S>(&mut self, emails: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        remove_all(&mut self.shared_with, emails)
    }

    /// Add tags not already present (exact match). Returns the ones added.
    pub fn add_tags<I, S>(&mut self, tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_unique(&mut self.tags, tags)
    }

    pub fn remove_tags<I, S>(&mut self, tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        remove_all(&mut self.tags, tags)
    }
}

/// Input for creating a task; id and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub due_date: Option<DateTime<Utc>>,
    pub shared_with: Vec<String>,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
            status: Status::Todo,
            due_date: None,
            shared_with: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Apply boundary rules: trim text, reject empty titles, dedupe lists.
    pub fn normalized(self) -> Result<Self> {
        let title = normalize_title(&self.title)?;
        let mut shared_with = Vec::new();
        for email in &self.shared_with {
            if email.trim().is_empty() {
                continue;
            }
            validate_email(email)?;
        }
        push_unique(&mut shared_with, &self.shared_with);
        let mut tags = Vec::new();
        push_unique(&mut tags, &self.tags);
        Ok(Self {
            title,
            description: self.description.trim().to_string(),
            shared_with,
            tags,
            ..self
        })
    }
}

/// Partial update. `None` leaves a field untouched; `due_date: Some(None)`
/// clears the due date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

pub fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("title cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Minimal shape check: one `@`, non-empty local part and domain.
pub fn validate_email(email: &str) -> Result<()> {
    let trimmed = email.trim();
    let mut parts = trimmed.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || parts.next().is_some() || trimmed.contains(' ') {
        return Err(Error::InvalidArgument(format!(
            "invalid email address '{trimmed}'"
        )));
    }
    Ok(())
}

fn push_unique<I, S>(target: &mut Vec<String>, values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut added = Vec::new();
    for value in values {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() || target.iter().any(|existing| existing == trimmed) {
            continue;
        }
        target.push(trimmed.to_string());
        added.push(trimmed.to_string());
    }
    added
}

fn remove_all<I, S>(target: &mut Vec<String>, values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut removed = Vec::new();
    for value in values {
        let trimmed = value.as_ref().trim();
        if let Some(idx) = target.iter().position(|existing| existing == trimmed) {
            removed.push(target.remove(idx));
        }
    }
    removed
}

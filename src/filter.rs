//! Filter engine: status, priority and free-text search over a task list.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::task::{Priority, Status, Task};

const ALL: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str(ALL),
            StatusFilter::Only(status) => fmt::Display::fmt(status, f),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(ALL) {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

impl Serialize for StatusFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(wanted) => wanted == priority,
        }
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFilter::All => f.write_str(ALL),
            PriorityFilter::Only(priority) => fmt::Display::fmt(priority, f),
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(ALL) {
            return Ok(PriorityFilter::All);
        }
        s.parse().map(PriorityFilter::Only)
    }
}

impl Serialize for PriorityFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Filter criteria. The default matches every task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub priority: PriorityFilter,
    pub search: String,
}

impl TaskFilter {
    pub fn is_pass_through(&self) -> bool {
        self.status == StatusFilter::All
            && self.priority == PriorityFilter::All
            && self.search.is_empty()
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.matches(task.status)
            && self.priority.matches(task.priority)
            && matches_search(task, &self.search.to_lowercase())
    }
}

/// Tasks satisfying every criterion, in input order.
pub fn filter_tasks(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    let needle = filter.search.to_lowercase();
    tasks
        .iter()
        .filter(|task| {
            filter.status.matches(task.status)
                && filter.priority.matches(task.priority)
                && matches_search(task, &needle)
        })
        .cloned()
        .collect()
}

/// Case-insensitive substring match on title, description or any tag.
/// `needle` must already be lowercased; an empty needle matches.
fn matches_search(task: &Task, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(needle)
        || task.description.to_lowercase().contains(needle)
        || task
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

/// Tasks owned by `email` or shared with it. Ownerless tasks are visible to
/// everyone.
pub fn visible_to(tasks: &[Task], email: &str) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| match task.owner.as_deref() {
            None => true,
            Some(owner) => owner == email || task.shared_with.iter().any(|e| e == email),
        })
        .cloned()
        .collect()
}

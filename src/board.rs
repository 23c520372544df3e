//! Board columns and summary counts.

use serde::Serialize;

use crate::task::{Status, Task};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub status: Status,
    pub title: &'static str,
    pub tasks: Vec<Task>,
}

/// One column per status, in workflow order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub columns: Vec<Column>,
}

impl Board {
    pub fn column(&self, status: Status) -> Option<&Column> {
        self.columns.iter().find(|column| column.status == status)
    }
}

pub fn board(tasks: &[Task]) -> Board {
    let columns = Status::ALL
        .iter()
        .map(|&status| Column {
            status,
            title: status.label(),
            tasks: tasks
                .iter()
                .filter(|task| task.status == status)
                .cloned()
                .collect(),
        })
        .collect();
    Board { columns }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub todo: usize,
    pub shared: usize,
}

pub fn stats(tasks: &[Task]) -> TaskStats {
    let mut stats = TaskStats {
        total: tasks.len(),
        ..TaskStats::default()
    };
    for task in tasks {
        match task.status {
            Status::Todo => stats.todo += 1,
            Status::InProgress => stats.in_progress += 1,
            Status::Completed => stats.completed += 1,
        }
        if task.is_shared() {
            stats.shared += 1;
        }
    }
    stats
}

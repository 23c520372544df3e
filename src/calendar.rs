//! Calendar index: which days have tasks due, and which tasks fall on a day.
//!
//! Calendar days are taken in an explicit timezone supplied by the caller.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::task::Task;

/// Calendar day of `instant` in `tz`.
pub fn calendar_day<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Distinct due days, ascending.
pub fn dates_with_tasks<Tz: TimeZone>(tasks: &[Task], tz: &Tz) -> BTreeSet<NaiveDate> {
    tasks
        .iter()
        .filter_map(|task| task.due_date.as_ref())
        .map(|due| calendar_day(due, tz))
        .collect()
}

/// Tasks due on `date`, in task-list order.
pub fn tasks_for_date<Tz: TimeZone>(tasks: &[Task], date: NaiveDate, tz: &Tz) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| {
            task.due_date
                .as_ref()
                .is_some_and(|due| calendar_day(due, tz) == date)
        })
        .cloned()
        .collect()
}

/// Tasks bucketed by due day. Built once per snapshot for repeated lookups.
#[derive(Debug, Clone, Default)]
pub struct CalendarIndex {
    days: BTreeMap<NaiveDate, Vec<Task>>,
}

impl CalendarIndex {
    pub fn build<Tz: TimeZone>(tasks: &[Task], tz: &Tz) -> Self {
        let mut days: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
        for task in tasks {
            if let Some(due) = task.due_date.as_ref() {
                days.entry(calendar_day(due, tz))
                    .or_default()
                    .push(task.clone());
            }
        }
        Self { days }
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn has_tasks(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    pub fn tasks_on(&self, date: NaiveDate) -> &[Task] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Days in `[from, to]` with their tasks, ascending.
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = (NaiveDate, &[Task])> + '_ {
        self.days
            .range(from..=to)
            .map(|(date, tasks)| (*date, tasks.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

//! Derived views over a snapshot.
//!
//! Everything here is recomputable from `(snapshot, criteria, now)`. The
//! cache only skips work; it never changes what callers observe.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;

use crate::alerts::{derive_notifications, Alert};
use crate::board::{board, stats, Board, TaskStats};
use crate::calendar::dates_with_tasks;
use crate::filter::{filter_tasks, TaskFilter};
use crate::store::Snapshot;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedViews {
    pub version: u64,
    /// Tasks matching the criteria, in snapshot order.
    pub filtered: Vec<Task>,
    /// Board over the filtered list.
    pub board: Board,
    /// Counts over the full list.
    pub stats: TaskStats,
    /// Alerts over the full list.
    pub alerts: Vec<Alert>,
    /// Due days over the full list, in the timezone of `now`.
    pub dates: BTreeSet<NaiveDate>,
}

impl DerivedViews {
    pub fn compute<Tz: TimeZone>(
        snapshot: &Snapshot,
        criteria: &TaskFilter,
        now: &DateTime<Tz>,
    ) -> Self {
        let filtered = filter_tasks(&snapshot.tasks, criteria);
        Self::assemble(snapshot, filtered, now)
    }

    fn assemble<Tz: TimeZone>(snapshot: &Snapshot, filtered: Vec<Task>, now: &DateTime<Tz>) -> Self {
        Self {
            version: snapshot.version,
            board: board(&filtered),
            filtered,
            stats: stats(&snapshot.tasks),
            alerts: derive_notifications(&snapshot.tasks, now),
            dates: dates_with_tasks(&snapshot.tasks, &now.timezone()),
        }
    }
}

/// Memoizes the filtered list on `(snapshot version, criteria)`.
///
/// Alerts are always recomputed since they depend on the current time.
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<(u64, TaskFilter)>,
    filtered: Vec<Task>,
    pub hits: u64,
    pub misses: u64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered(&mut self, snapshot: &Snapshot, criteria: &TaskFilter) -> &[Task] {
        let fresh = matches!(
            &self.key,
            Some((version, cached)) if *version == snapshot.version && cached == criteria
        );
        if fresh {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.filtered = filter_tasks(&snapshot.tasks, criteria);
            self.key = Some((snapshot.version, criteria.clone()));
        }
        &self.filtered
    }

    pub fn views<Tz: TimeZone>(
        &mut self,
        snapshot: &Snapshot,
        criteria: &TaskFilter,
        now: &DateTime<Tz>,
    ) -> DerivedViews {
        let filtered = self.filtered(snapshot, criteria).to_vec();
        DerivedViews::assemble(snapshot, filtered, now)
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.filtered.clear();
    }
}

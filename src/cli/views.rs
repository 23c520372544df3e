//! Read-only commands over derived views: list, board, stats, alerts,
//! calendar and watch.

use std::ops::ControlFlow;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::alerts::{derive_notifications, Alert};
use crate::board::{board, stats, Board, TaskStats};
use crate::calendar::{tasks_for_date, CalendarIndex};
use crate::cli::context::{load_context, parse_date, parse_now, task_line, GlobalArgs};
use crate::error::{Error, Result};
use crate::filter::{filter_tasks, visible_to, PriorityFilter, StatusFilter, TaskFilter};
use crate::output::{emit_success, HumanOutput};
use crate::task::Task;
use crate::views::ViewCache;
use crate::watch::{watch, WATCH_DEBOUNCE_MS};

/// Filter flags shared by `list`, `board` and `watch`.
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub status: String,
    pub priority: String,
    pub search: Option<String>,
    pub mine: bool,
}

impl FilterArgs {
    fn criteria(&self) -> Result<TaskFilter> {
        Ok(TaskFilter {
            status: self.status.parse::<StatusFilter>()?,
            priority: self.priority.parse::<PriorityFilter>()?,
            search: self.search.clone().unwrap_or_default(),
        })
    }
}

pub struct CalendarOptions {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub mine: bool,
}

pub struct WatchOptions {
    pub filters: FilterArgs,
    pub debounce_ms: Option<u64>,
    pub max_updates: Option<usize>,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    filter: &'a TaskFilter,
    count: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct AlertsOutput {
    now: DateTime<FixedOffset>,
    count: usize,
    alerts: Vec<Alert>,
}

#[derive(Serialize)]
struct CalendarDay {
    date: NaiveDate,
    count: usize,
}

#[derive(Serialize)]
struct CalendarOutput {
    utc_offset: String,
    dates: Vec<CalendarDay>,
}

#[derive(Serialize)]
struct CalendarDateOutput {
    date: NaiveDate,
    utc_offset: String,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct WatchUpdate<'a> {
    version: u64,
    stats: TaskStats,
    alerts: &'a [Alert],
}

pub fn run_list(filters: FilterArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let criteria = filters.criteria()?;
    let snapshot = ctx.store.snapshot()?;
    let scope = scoped_tasks(&snapshot.tasks, filters.mine, ctx.user_email())?;
    let tasks = filter_tasks(&scope, &criteria);

    let mut human = HumanOutput::new(format!("Tasks ({})", tasks.len()));
    if !criteria.is_pass_through() {
        human.push_summary("Status", criteria.status.to_string());
        human.push_summary("Priority", criteria.priority.to_string());
        if !criteria.search.is_empty() {
            human.push_summary("Search", criteria.search.clone());
        }
    }
    for task in &tasks {
        human.push_detail(task_line(task, ctx.offset));
    }
    if snapshot.tasks.is_empty() {
        human.push_next_step("taskboard add \"<title>\"");
    }

    let output = ListOutput {
        filter: &criteria,
        count: tasks.len(),
        tasks,
    };
    emit_success(global.output(), "list", &output, Some(&human))
}

pub fn run_board(filters: FilterArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let criteria = filters.criteria()?;
    let snapshot = ctx.store.snapshot()?;
    let scope = scoped_tasks(&snapshot.tasks, filters.mine, ctx.user_email())?;
    let board: Board = board(&filter_tasks(&scope, &criteria));

    let mut human = HumanOutput::new("Board");
    for column in &board.columns {
        human.push_summary(column.title, column.tasks.len().to_string());
        for task in &column.tasks {
            human.push_detail(format!("{}: {}", column.title, task_line(task, ctx.offset)));
        }
    }
    emit_success(global.output(), "board", &board, Some(&human))
}

pub fn run_stats(mine: bool, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let snapshot = ctx.store.snapshot()?;
    let stats = stats(&scoped_tasks(&snapshot.tasks, mine, ctx.user_email())?);

    let mut human = HumanOutput::new("Task stats");
    human.push_summary("Total", stats.total.to_string());
    human.push_summary("To Do", stats.todo.to_string());
    human.push_summary("In Progress", stats.in_progress.to_string());
    human.push_summary("Completed", stats.completed.to_string());
    human.push_summary("Shared", stats.shared.to_string());
    emit_success(global.output(), "stats", &stats, Some(&human))
}

pub fn run_alerts(now: Option<String>, mine: bool, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let now = parse_now(now.as_deref(), ctx.offset)?;
    let snapshot = ctx.store.snapshot()?;
    let scope = scoped_tasks(&snapshot.tasks, mine, ctx.user_email())?;
    let alerts = derive_notifications(&scope, &now);

    let mut human = HumanOutput::new(format!("Alerts ({})", alerts.len()));
    for alert in &alerts {
        human.push_detail(format!("[{}] {} ({})", alert.kind.as_str(), alert.message, alert.id));
    }
    let output = AlertsOutput {
        now,
        count: alerts.len(),
        alerts,
    };
    emit_success(global.output(), "alerts", &output, Some(&human))
}

pub fn run_calendar(options: CalendarOptions, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let snapshot = ctx.store.snapshot()?;
    let scope = scoped_tasks(&snapshot.tasks, options.mine, ctx.user_email())?;
    let utc_offset = ctx.offset.to_string();

    if let Some(date) = options.date.as_deref() {
        if options.from.is_some() || options.to.is_some() {
            return Err(Error::InvalidArgument(
                "--date cannot be combined with --from/--to".to_string(),
            ));
        }
        let date = parse_date("date", date)?;
        let tasks = tasks_for_date(&scope, date, &ctx.offset);

        let mut human = HumanOutput::new(format!("Tasks due {date} ({})", tasks.len()));
        for task in &tasks {
            human.push_detail(task_line(task, ctx.offset));
        }
        let output = CalendarDateOutput {
            date,
            utc_offset,
            tasks,
        };
        return emit_success(global.output(), "calendar", &output, Some(&human));
    }

    let index = CalendarIndex::build(&scope, &ctx.offset);
    let from = options
        .from
        .as_deref()
        .map(|value| parse_date("--from date", value))
        .transpose()?
        .unwrap_or(NaiveDate::MIN);
    let to = options
        .to
        .as_deref()
        .map(|value| parse_date("--to date", value))
        .transpose()?
        .unwrap_or(NaiveDate::MAX);
    if from > to {
        return Err(Error::InvalidArgument(format!(
            "--from {from} is after --to {to}"
        )));
    }

    let dates: Vec<CalendarDay> = index
        .range(from, to)
        .map(|(date, tasks)| CalendarDay {
            date,
            count: tasks.len(),
        })
        .collect();

    let mut human = HumanOutput::new(format!("Days with tasks ({})", dates.len()));
    for day in &dates {
        human.push_detail(format!("{} ({})", day.date, day.count));
    }
    let output = CalendarOutput { utc_offset, dates };
    emit_success(global.output(), "calendar", &output, Some(&human))
}

pub fn run_watch(options: WatchOptions, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let criteria = options.filters.criteria()?;
    let scope_email = viewer(options.filters.mine, ctx.user_email())?;
    let debounce = Duration::from_millis(options.debounce_ms.unwrap_or(WATCH_DEBOUNCE_MS));
    let mut cache = ViewCache::new();
    let mut updates = 0usize;

    watch(&ctx.store, debounce, |mut snapshot| {
        if let Some(email) = scope_email {
            snapshot.tasks = visible_to(&snapshot.tasks, email);
        }
        let views = cache.views(&snapshot, &criteria, &ctx.now());
        updates += 1;

        if global.json {
            let update = WatchUpdate {
                version: views.version,
                stats: views.stats,
                alerts: &views.alerts,
            };
            match serde_json::to_string(&update) {
                Ok(line) => println!("{line}"),
                Err(err) => tracing::warn!(error = %err, "failed to encode watch update"),
            }
        } else if !global.quiet {
            println!(
                "[v{}] {} task(s), {} matching, {} alert(s)",
                views.version,
                views.stats.total,
                views.filtered.len(),
                views.alerts.len()
            );
            for alert in &views.alerts {
                println!("  [{}] {}", alert.kind.as_str(), alert.message);
            }
        }

        match options.max_updates {
            Some(max) if updates >= max => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })
}

/// Narrow to the current user's tasks for `--mine`.
fn scoped_tasks(tasks: &[Task], mine: bool, user: Option<&str>) -> Result<Vec<Task>> {
    match viewer(mine, user)? {
        Some(email) => Ok(visible_to(tasks, email)),
        None => Ok(tasks.to_vec()),
    }
}

/// The email `--mine` scopes to; an error when no identity is known.
fn viewer(mine: bool, user: Option<&str>) -> Result<Option<&str>> {
    if !mine {
        return Ok(None);
    }
    user.map(Some).ok_or_else(|| {
        Error::InvalidArgument("--mine needs a user identity (--user or whoami --set)".to_string())
    })
}

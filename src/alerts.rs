//! Due-date alerts derived from the task list.
//!
//! Alerts are never stored. Day differences are whole calendar days in the
//! timezone of the evaluation instant, so a task due at 23:59 tomorrow and
//! one due at 00:01 tomorrow both read as "due tomorrow".

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;

use crate::task::{Status, Task};

/// Tasks due within this many days (inclusive) raise a due-soon alert.
pub const DUE_SOON_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    Overdue,
    DueToday,
    DueTomorrow,
    DueSoon,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Overdue => "overdue",
            AlertKind::DueToday => "due-today",
            AlertKind::DueTomorrow => "due-tomorrow",
            AlertKind::DueSoon => "due-soon",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Id of the task the alert is about.
    pub id: String,
    pub kind: AlertKind,
    /// Signed calendar days until due; negative when overdue.
    pub days_until_due: i64,
    pub message: String,
    pub task: Task,
}

impl Alert {
    /// Whole days overdue or remaining, without sign.
    pub fn day_count(&self) -> i64 {
        self.days_until_due.abs()
    }
}

/// Classify a due day relative to today. `None` means no alert.
pub fn classify(due: NaiveDate, today: NaiveDate) -> Option<AlertKind> {
    let diff = due.signed_duration_since(today).num_days();
    match diff {
        d if d < 0 => Some(AlertKind::Overdue),
        0 => Some(AlertKind::DueToday),
        1 => Some(AlertKind::DueTomorrow),
        d if d <= DUE_SOON_DAYS => Some(AlertKind::DueSoon),
        _ => None,
    }
}

/// One alert per open task with a due date close to or before `now`, in
/// task-list order.
pub fn derive_notifications<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> Vec<Alert> {
    let tz = now.timezone();
    let today = now.date_naive();

    tasks
        .iter()
        .filter(|task| task.status != Status::Completed)
        .filter_map(|task| {
            let due = task.due_date?.with_timezone(&tz).date_naive();
            let kind = classify(due, today)?;
            let days_until_due = due.signed_duration_since(today).num_days();
            Some(Alert {
                id: task.id.clone(),
                kind,
                days_until_due,
                message: alert_message(&task.title, kind, days_until_due),
                task: task.clone(),
            })
        })
        .collect()
}

fn alert_message(title: &str, kind: AlertKind, days_until_due: i64) -> String {
    match kind {
        AlertKind::Overdue => format!("\"{title}\" is {} day(s) overdue", days_until_due.abs()),
        AlertKind::DueToday => format!("\"{title}\" is due today"),
        AlertKind::DueTomorrow => format!("\"{title}\" is due tomorrow"),
        AlertKind::DueSoon => format!("\"{title}\" is due in {days_until_due} day(s)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use chrono::{FixedOffset, Utc};

    fn task(id: &str, due: Option<&str>, status: Status) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            description: String::new(),
            priority: Priority::Medium,
            status,
            due_date: due.map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .unwrap()
                    .with_timezone(&Utc)
            }),
            created_at: now,
            updated_at: now,
            owner: None,
            shared_with: Vec::new(),
            tags: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-10T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn classifies_reference_scenario() {
        let tasks = vec![
            task("A", Some("2024-06-08T12:00:00Z"), Status::Todo),
            task("B", Some("2024-06-10T18:00:00Z"), Status::Todo),
            task("C", Some("2024-06-11T08:00:00Z"), Status::InProgress),
            task("D", Some("2024-06-20T08:00:00Z"), Status::Todo),
            task("E", None, Status::Todo),
        ];

        let alerts = derive_notifications(&tasks, &now());
        let summary: Vec<(&str, AlertKind)> =
            alerts.iter().map(|a| (a.id.as_str(), a.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("A", AlertKind::Overdue),
                ("B", AlertKind::DueToday),
                ("C", AlertKind::DueTomorrow),
            ]
        );
        assert_eq!(alerts[0].day_count(), 2);
        assert_eq!(alerts[0].message, "\"Task A\" is 2 day(s) overdue");
        assert_eq!(alerts[1].message, "\"Task B\" is due today");
        assert_eq!(alerts[2].message, "\"Task C\" is due tomorrow");
    }

    #[test]
    fn earlier_today_is_due_today_not_overdue() {
        let tasks = vec![task("B", Some("2024-06-10T01:00:00Z"), Status::Todo)];

        let alerts = derive_notifications(&tasks, &now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::DueToday);
        assert_eq!(alerts[0].days_until_due, 0);
        assert_eq!(alerts[0].message, "\"Task B\" is due today");
    }

    #[test]
    fn completed_tasks_never_alert() {
        let tasks = vec![
            task("F", Some("2024-06-12T08:00:00Z"), Status::Completed),
            task("G", Some("2024-06-01T08:00:00Z"), Status::Completed),
        ];
        assert!(derive_notifications(&tasks, &now()).is_empty());
    }

    #[test]
    fn due_soon_boundary_is_inclusive() {
        let tasks = vec![
            task("two", Some("2024-06-12T23:59:00Z"), Status::Todo),
            task("three", Some("2024-06-13T00:00:00Z"), Status::Todo),
            task("four", Some("2024-06-14T00:00:00Z"), Status::Todo),
        ];
        let alerts = derive_notifications(&tasks, &now());
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::DueSoon);
        assert_eq!(alerts[0].message, "\"Task two\" is due in 2 day(s)");
        assert_eq!(alerts[1].days_until_due, 3);
    }

    #[test]
    fn days_are_counted_in_the_timezone_of_now() {
        // 23:30Z on 06-10 is already 06-11 at +02:00.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let tasks = vec![task("late", Some("2024-06-10T23:30:00Z"), Status::Todo)];

        let alerts = derive_notifications(&tasks, &now);
        assert_eq!(alerts[0].kind, AlertKind::DueTomorrow);

        let utc_alerts = derive_notifications(&tasks, &now.with_timezone(&Utc));
        assert_eq!(utc_alerts[0].kind, AlertKind::DueToday);
    }

    #[test]
    fn classify_covers_every_band() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        assert_eq!(classify(day(9), today), Some(AlertKind::Overdue));
        assert_eq!(classify(day(10), today), Some(AlertKind::DueToday));
        assert_eq!(classify(day(11), today), Some(AlertKind::DueTomorrow));
        assert_eq!(classify(day(13), today), Some(AlertKind::DueSoon));
        assert_eq!(classify(day(14), today), None);
    }

    #[test]
    fn alert_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&AlertKind::DueTomorrow).unwrap();
        assert_eq!(json, "\"due-tomorrow\"");
        assert_eq!(AlertKind::DueSoon.as_str(), "due-soon");
    }
}

//! Task mutation and lookup commands.

use serde::Serialize;

use crate::cli::context::{load_context, parse_due, BoardContext, GlobalArgs};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::{NewTask, Priority, Status, Task, TaskPatch};
use crate::user;

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due: Option<String>,
    pub share: Vec<String>,
    pub tags: Vec<String>,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub clear_due: bool,
}

pub struct StatusOptions {
    pub id: String,
    pub status: String,
}

/// Which list a share/tag command edits, and in which direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEdit {
    Share,
    Unshare,
    Tag,
    Untag,
}

impl ListEdit {
    fn command(self) -> &'static str {
        match self {
            ListEdit::Share => "share",
            ListEdit::Unshare => "unshare",
            ListEdit::Tag => "tag",
            ListEdit::Untag => "untag",
        }
    }
}

pub struct ListEditOptions {
    pub id: String,
    pub values: Vec<String>,
    pub edit: ListEdit,
}

#[derive(Serialize)]
struct DeletedOutput {
    id: String,
    title: String,
}

#[derive(Serialize)]
struct WhoamiOutput {
    email: Option<String>,
    source: Option<user::UserSource>,
}

pub fn run_add(options: AddOptions, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let defaults = &ctx.config.tasks;

    let mut input = NewTask::new(options.title);
    input.description = options.description.unwrap_or_default();
    input.priority = match options.priority.as_deref() {
        Some(value) => value.parse()?,
        None => defaults.default_priority,
    };
    input.status = match options.status.as_deref() {
        Some(value) => value.parse()?,
        None => defaults.default_status,
    };
    input.due_date = options
        .due
        .as_deref()
        .map(|value| parse_due(value, ctx.offset))
        .transpose()?;
    input.shared_with = options.share;
    input.tags = options.tags;

    let task = ctx.store.create(input)?;

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, &task, &ctx);
    if ctx.user.is_none() {
        human.push_warning("no user identity; task has no owner");
        human.push_next_step("taskboard whoami --set <email>");
    }
    emit_success(global.output(), "add", &task, Some(&human))
}

pub fn run_show(id: &str, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let resolved = ctx.resolve(id)?;
    let task = ctx.store.get(&resolved)?;

    let mut human = HumanOutput::new(format!("Task {resolved}"));
    push_task_summary(&mut human, &task, &ctx);
    if !task.description.is_empty() {
        human.push_detail(task.description.clone());
    }
    emit_success(global.output(), "show", &task, Some(&human))
}

pub fn run_edit(options: EditOptions, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    if options.clear_due && options.due.is_some() {
        return Err(Error::InvalidArgument(
            "--due and --clear-due are mutually exclusive".to_string(),
        ));
    }
    let resolved = ctx.resolve(&options.id)?;

    let due_date = if options.clear_due {
        Some(None)
    } else {
        options
            .due
            .as_deref()
            .map(|value| parse_due(value, ctx.offset).map(Some))
            .transpose()?
    };
    let patch = TaskPatch {
        title: options.title,
        description: options.description,
        priority: options
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?,
        due_date,
    };
    let task = ctx.store.edit(&resolved, patch)?;

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &task, &ctx);
    emit_success(global.output(), "edit", &task, Some(&human))
}

pub fn run_status(options: StatusOptions, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let status: Status = options.status.parse()?;
    let resolved = ctx.resolve(&options.id)?;
    let task = ctx.store.set_status(&resolved, status)?;

    let mut human = HumanOutput::new("Task status updated");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Status", task.status.to_string());
    emit_success(global.output(), "status", &task, Some(&human))
}

pub fn run_rm(id: &str, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let resolved = ctx.resolve(id)?;
    let task = ctx.store.delete(&resolved)?;

    let output = DeletedOutput {
        id: task.id.clone(),
        title: task.title.clone(),
    };
    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", task.id);
    human.push_summary("Title", task.title);
    emit_success(global.output(), "rm", &output, Some(&human))
}

pub fn run_list_edit(options: ListEditOptions, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let resolved = ctx.resolve(&options.id)?;
    let before = ctx.store.get(&resolved)?;
    let task = match options.edit {
        ListEdit::Share => ctx.store.share(&resolved, &options.values)?,
        ListEdit::Unshare => ctx.store.unshare(&resolved, &options.values)?,
        ListEdit::Tag => ctx.store.tag(&resolved, &options.values)?,
        ListEdit::Untag => ctx.store.untag(&resolved, &options.values)?,
    };

    let (label, values) = match options.edit {
        ListEdit::Share | ListEdit::Unshare => ("Shared with", &task.shared_with),
        ListEdit::Tag | ListEdit::Untag => ("Tags", &task.tags),
    };
    let mut human = HumanOutput::new(format!("Task {}", task.id));
    human.push_summary(label, values.join(", "));
    if before == task {
        human.push_warning("nothing changed");
    }
    emit_success(global.output(), options.edit.command(), &task, Some(&human))
}

pub fn run_whoami(set: Option<String>, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    if let Some(email) = set {
        let email = user::persist_user(ctx.store.storage(), &email)?;
        let output = WhoamiOutput {
            email: Some(email.clone()),
            source: Some(user::UserSource::Board),
        };
        let mut human = HumanOutput::new("User set");
        human.push_summary("Email", email);
        return emit_success(global.output(), "whoami", &output, Some(&human));
    }

    let output = WhoamiOutput {
        email: ctx.user.as_ref().map(|user| user.email.clone()),
        source: ctx.user.as_ref().map(|user| user.source),
    };
    let mut human = HumanOutput::new(
        ctx.user_email()
            .map(str::to_string)
            .unwrap_or_else(|| "anonymous".to_string()),
    );
    if ctx.user.is_none() {
        human.push_next_step("taskboard whoami --set <email>");
    }
    emit_success(global.output(), "whoami", &output, Some(&human))
}

fn push_task_summary(human: &mut HumanOutput, task: &Task, ctx: &BoardContext) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", task.priority.to_string());
    if let Some(due) = task.due_date {
        human.push_summary("Due", due.with_timezone(&ctx.offset).date_naive().to_string());
    }
    if let Some(owner) = task.owner.as_ref() {
        human.push_summary("Owner", owner.clone());
    }
    if !task.shared_with.is_empty() {
        human.push_summary("Shared with", task.shared_with.join(", "));
    }
    if !task.tags.is_empty() {
        human.push_summary("Tags", task.tags.join(", "));
    }
    human.push_summary("Updated", task.updated_at.to_rfc3339());
}

//! Command-line interface for taskboard
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in the submodules.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;

pub mod context;
mod init;
mod task;
mod views;

pub use context::GlobalArgs;

/// taskboard - a file-backed task board
///
/// Tracks tasks with status, priority, due dates, tags and sharing, and
/// derives filtered lists, board columns, due-date alerts and a calendar.
#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Board root (defaults to the nearest directory holding .taskboard/)
    #[arg(long, global = true, env = "TASKBOARD_ROOT")]
    pub root: Option<PathBuf>,

    /// Email of the current user
    #[arg(long, global = true, env = "TASKBOARD_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Status, priority and search flags shared by list-style commands
#[derive(Args, Debug, Clone)]
pub struct FilterFlags {
    /// Status filter: all, todo, in-progress, completed
    #[arg(long, default_value = "all")]
    pub status: String,

    /// Priority filter: all, low, medium, high
    #[arg(long, default_value = "all")]
    pub priority: String,

    /// Case-insensitive text matched against title, description and tags
    #[arg(long)]
    pub search: Option<String>,

    /// Only tasks owned by or shared with the current user
    #[arg(long)]
    pub mine: bool,
}

impl From<FilterFlags> for views::FilterArgs {
    fn from(flags: FilterFlags) -> Self {
        views::FilterArgs {
            status: flags.status,
            priority: flags.priority,
            search: flags.search,
            mine: flags.mine,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a board in the current directory
    Init {
        /// Task ID prefix (default: tb)
        #[arg(long)]
        prefix: Option<String>,

        /// UTC offset used for calendar days, e.g. +02:00
        #[arg(long)]
        utc_offset: Option<String>,
    },

    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,

        /// Initial status: todo, in-progress, completed
        #[arg(short, long)]
        status: Option<String>,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,

        /// Share with an email (repeatable)
        #[arg(long = "share", value_name = "EMAIL")]
        share: Vec<String>,

        /// Tag (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tag: Vec<String>,
    },

    /// Show a task
    Show {
        /// Task ID (full, suffix, or unique prefix)
        id: String,
    },

    /// Edit task fields
    Edit {
        /// Task ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New priority
        #[arg(short, long)]
        priority: Option<String>,

        /// New due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },

    /// Set task status
    Status {
        /// Task ID
        id: String,

        /// New status: todo, in-progress, completed
        status: String,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },

    /// Share a task with one or more emails
    Share {
        /// Task ID
        id: String,

        /// Emails to add
        #[arg(required = true)]
        emails: Vec<String>,
    },

    /// Stop sharing a task with one or more emails
    Unshare {
        /// Task ID
        id: String,

        /// Emails to remove
        #[arg(required = true)]
        emails: Vec<String>,
    },

    /// Add tags to a task
    Tag {
        /// Task ID
        id: String,

        /// Tags to add
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Remove tags from a task
    Untag {
        /// Task ID
        id: String,

        /// Tags to remove
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// List tasks matching filters
    List {
        #[command(flatten)]
        filters: FilterFlags,
    },

    /// Show tasks grouped into status columns
    Board {
        #[command(flatten)]
        filters: FilterFlags,
    },

    /// Show task counts
    Stats {
        /// Only tasks owned by or shared with the current user
        #[arg(long)]
        mine: bool,
    },

    /// Show due-date alerts
    Alerts {
        /// Evaluate at this instant (RFC 3339) instead of the current time
        #[arg(long)]
        now: Option<String>,

        /// Only tasks owned by or shared with the current user
        #[arg(long)]
        mine: bool,
    },

    /// Show days with tasks due, or the tasks due on one day
    Calendar {
        /// Day to show (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// First day of the listed range (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last day of the listed range (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Only tasks owned by or shared with the current user
        #[arg(long)]
        mine: bool,
    },

    /// Re-print alerts whenever the board changes
    Watch {
        #[command(flatten)]
        filters: FilterFlags,

        /// Debounce window in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Exit after this many updates (the initial one included)
        #[arg(long)]
        max_updates: Option<usize>,
    },

    /// Show or set the current user
    Whoami {
        /// Persist this email as the board's default user
        #[arg(long, value_name = "EMAIL")]
        set: Option<String>,
    },
}

impl Cli {
    fn global(&self) -> GlobalArgs {
        GlobalArgs {
            root: self.root.clone(),
            user: self.user.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Init { prefix, utc_offset } => {
                init::run(init::InitOptions { prefix, utc_offset }, &global)
            }
            Commands::Add {
                title,
                description,
                priority,
                status,
                due,
                share,
                tag,
            } => task::run_add(
                task::AddOptions {
                    title,
                    description,
                    priority,
                    status,
                    due,
                    share,
                    tags: tag,
                },
                &global,
            ),
            Commands::Show { id } => task::run_show(&id, &global),
            Commands::Edit {
                id,
                title,
                description,
                priority,
                due,
                clear_due,
            } => task::run_edit(
                task::EditOptions {
                    id,
                    title,
                    description,
                    priority,
                    due,
                    clear_due,
                },
                &global,
            ),
            Commands::Status { id, status } => {
                task::run_status(task::StatusOptions { id, status }, &global)
            }
            Commands::Rm { id } => task::run_rm(&id, &global),
            Commands::Share { id, emails } => task::run_list_edit(
                task::ListEditOptions {
                    id,
                    values: emails,
                    edit: task::ListEdit::Share,
                },
                &global,
            ),
            Commands::Unshare { id, emails } => task::run_list_edit(
                task::ListEditOptions {
                    id,
                    values: emails,
                    edit: task::ListEdit::Unshare,
                },
                &global,
            ),
            Commands::Tag { id, tags } => task::run_list_edit(
                task::ListEditOptions {
                    id,
                    values: tags,
                    edit: task::ListEdit::Tag,
                },
                &global,
            ),
            Commands::Untag { id, tags } => task::run_list_edit(
                task::ListEditOptions {
                    id,
                    values: tags,
                    edit: task::ListEdit::Untag,
                },
                &global,
            ),
            Commands::List { filters } => views::run_list(filters.into(), &global),
            Commands::Board { filters } => views::run_board(filters.into(), &global),
            Commands::Stats { mine } => views::run_stats(mine, &global),
            Commands::Alerts { now, mine } => views::run_alerts(now, mine, &global),
            Commands::Calendar {
                date,
                from,
                to,
                mine,
            } => views::run_calendar(
                views::CalendarOptions {
                    date,
                    from,
                    to,
                    mine,
                },
                &global,
            ),
            Commands::Watch {
                filters,
                debounce_ms,
                max_updates,
            } => views::run_watch(
                views::WatchOptions {
                    filters: filters.into(),
                    debounce_ms,
                    max_updates,
                },
                &global,
            ),
            Commands::Whoami { set } => task::run_whoami(set, &global),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_collects_repeatable_flags() {
        let cli = Cli::try_parse_from([
            "taskboard", "add", "Ship it", "--tag", "a", "-t", "b", "--share", "x@example.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { title, tag, share, .. } => {
                assert_eq!(title, "Ship it");
                assert_eq!(tag, vec!["a", "b"]);
                assert_eq!(share, vec!["x@example.com"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn mine_is_accepted_by_derived_commands() {
        for args in [
            vec!["taskboard", "stats", "--mine"],
            vec!["taskboard", "alerts", "--mine"],
            vec!["taskboard", "calendar", "--mine"],
            vec!["taskboard", "watch", "--mine"],
        ] {
            assert!(Cli::try_parse_from(&args).is_ok(), "{args:?}");
        }
    }

    #[test]
    fn list_filters_default_to_all() {
        let cli = Cli::try_parse_from(["taskboard", "list"]).unwrap();
        match cli.command {
            Commands::List { filters } => {
                assert_eq!(filters.status, "all");
                assert_eq!(filters.priority, "all");
                assert!(filters.search.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

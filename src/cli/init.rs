//! taskboard init command implementation
//!
//! Creates the `.taskboard/` state directory and a default `.taskboard.toml`.

use std::path::PathBuf;

use crate::cli::context::GlobalArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::storage::Storage;

pub struct InitOptions {
    pub prefix: Option<String>,
    pub utc_offset: Option<String>,
}

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    state_dir: bool,
}

pub fn run(options: InitOptions, global: &GlobalArgs) -> Result<()> {
    let root = match global.root.clone() {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let storage = Storage::new(root);

    let config_path = storage.config_file();
    let new_config = if config_path.exists() {
        None
    } else {
        let mut config = Config::default();
        if let Some(prefix) = options.prefix {
            config.tasks.id_prefix = prefix.trim().to_string();
        }
        if let Some(offset) = options.utc_offset {
            config.calendar.utc_offset = Some(offset.trim().to_string());
        }
        config.validate()?;
        Some(config)
    };

    let created_state_dir = !storage.is_initialized();
    storage.init()?;

    let created_config = new_config.is_some();
    if let Some(config) = new_config {
        config.save(&config_path)?;
    }

    let report = InitReport {
        root: storage.root().to_path_buf(),
        created: InitCreated {
            config: created_config,
            state_dir: created_state_dir,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(crate::config::CONFIG_FILE);
    }
    if created_state_dir {
        created_items.push(".taskboard/");
    }

    let header = if created_items.is_empty() {
        "taskboard already initialized".to_string()
    } else {
        format!("taskboard initialized ({} created)", created_items.len())
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Board", storage.root().display().to_string());
    if !created_items.is_empty() {
        human.push_summary("Created", created_items.join(", "));
    }
    if storage.read_user().is_none() {
        human.push_next_step("taskboard whoami --set <email>");
    }

    emit_success(global.output(), "init", &report, Some(&human))
}

//! taskboard - file-backed task board CLI
//!
//! Tracks tasks on disk and derives filtered lists, board columns,
//! due-date alerts and a calendar from them.

use clap::Parser;
use taskboard::cli::Cli;
use taskboard::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let command = infer_command_name_from_args();
    let cli = Cli::parse();

    // Logs go to stderr so --json stdout stays parseable. An unusable
    // RUST_LOG falls back to the --verbose default.
    let default_filter = if cli.verbose { "taskboard=debug" } else { "off" };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}

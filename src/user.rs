//! Current user identity.
//!
//! Resolution order:
//! 1) CLI --user
//! 2) TASKBOARD_USER environment variable
//! 3) Persisted board value in .taskboard/user
//! 4) Config default (`[user] email`), else anonymous

use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;
use crate::task::validate_email;

pub const USER_ENV: &str = "TASKBOARD_USER";

/// Where the resolved identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserSource {
    Flag,
    Env,
    Board,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct User {
    pub email: String,
    pub source: UserSource,
}

/// Resolve the current user. `cli_user` is the `--user` flag; clap already
/// folds `TASKBOARD_USER` into it for the binary.
pub fn resolve_user(
    storage: &Storage,
    config: &Config,
    cli_user: Option<&str>,
) -> Result<Option<User>> {
    if let Some(email) = non_empty(cli_user) {
        validate_email(email)?;
        return Ok(Some(User {
            email: email.to_string(),
            source: UserSource::Flag,
        }));
    }

    if let Ok(env_user) = std::env::var(USER_ENV) {
        if let Some(email) = non_empty(Some(env_user.as_str())) {
            validate_email(email)?;
            return Ok(Some(User {
                email: email.to_string(),
                source: UserSource::Env,
            }));
        }
    }

    if let Some(email) = storage.read_user() {
        return Ok(Some(User {
            email,
            source: UserSource::Board,
        }));
    }

    Ok(non_empty(config.user.email.as_deref()).map(|email| User {
        email: email.to_string(),
        source: UserSource::Config,
    }))
}

/// Persist `email` as the board's default identity.
pub fn persist_user(storage: &Storage, email: &str) -> Result<String> {
    let email = email.trim();
    validate_email(email)?;
    storage.write_user(email)?;
    Ok(email.to_string())
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|value| !value.is_empty())
}

use std::path::Path;

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::error::DiscordTokenError;
use crate::oauth::{TokenRecord, TokenState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The bare access token.
    Raw,
    /// `Bearer <token>`, ready for an `Authorization` header.
    Bearer,
    /// The whole record as JSON.
    Json,
}

pub fn format_record(record: &TokenRecord, mode: OutputMode) -> String {
    match mode {
        OutputMode::Raw => record.access_token.clone(),
        OutputMode::Bearer => record.bearer(),
        OutputMode::Json => serde_json::to_string_pretty(record).unwrap_or_default(),
    }
}

pub fn print_record(record: &TokenRecord, mode: OutputMode) {
    println!("{}", format_record(record, mode));
}

fn label(text: &str, is_tty: bool) -> String {
    if is_tty {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Human-readable summary of the stored token for `show`.
pub fn format_status(
    state: TokenState,
    record: Option<&TokenRecord>,
    path: &Path,
    now: DateTime<Utc>,
    is_tty: bool,
) -> String {
    let state_text = match state {
        TokenState::Valid if is_tty => state.to_string().green().to_string(),
        TokenState::Expired if is_tty => state.to_string().yellow().to_string(),
        _ => state.to_string(),
    };

    let mut lines = vec![
        format!("{}: {}", label("File", is_tty), path.display()),
        format!("{}: {}", label("State", is_tty), state_text),
    ];
    if let Some(record) = record {
        lines.push(format!("{}: {}", label("Scope", is_tty), record.scope));
        let remaining = record.expires_at - now;
        let when = if remaining.num_seconds() > 0 {
            format!("{} (in {}s)", record.expires_at.to_rfc3339(), remaining.num_seconds())
        } else {
            record.expires_at.to_rfc3339()
        };
        lines.push(format!("{}: {}", label("Expires", is_tty), when));
        lines.push(record.to_string());
    }
    lines.join("\n")
}

pub fn format_error(err: &DiscordTokenError, json_mode: bool, is_tty: bool) -> String {
    if json_mode {
        return serde_json::to_string_pretty(&err.to_json()).unwrap_or_default();
    }
    let prefix = if is_tty {
        "Error".red().bold().to_string()
    } else {
        "Error".to_string()
    };
    format!("{prefix}: {err}")
}

/// JSON errors go to stdout alongside JSON results; plain errors go to stderr.
pub fn print_error(err: &DiscordTokenError, json_mode: bool) {
    if json_mode {
        println!("{}", format_error(err, true, false));
    } else {
        eprintln!("{}", format_error(err, false, stderr_is_tty()));
    }
}

pub fn stdout_is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

pub fn stderr_is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

use std::io::{self, BufRead, Write};

use chrono::Utc;
use colored::Colorize;

use crate::cli::output::{self, OutputMode};
use crate::config::Settings;
use crate::error::DiscordTokenError;
use crate::oauth::{
    build_authorization_url, ProviderClient, TokenManager, TokenOutcome, TokenRecord, TokenState,
    TokenStore,
};

/// Whether a command finished or stopped because no token is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Done,
    AuthorizationRequired,
}

pub fn build_manager(settings: &Settings) -> Result<TokenManager, DiscordTokenError> {
    let client = ProviderClient::new(settings.provider_config()?)?;
    Ok(TokenManager::new(client, TokenStore::new(&settings.token_path)))
}

/// Print a usable token, running the interactive authorization step when
/// nothing is cached yet.
pub async fn run_token(
    settings: &Settings,
    mode: OutputMode,
    open: bool,
) -> Result<CommandStatus, DiscordTokenError> {
    let manager = build_manager(settings)?;
    let record = match manager.get_usable_token().await? {
        TokenOutcome::Usable(record) => record,
        TokenOutcome::RequiresAuthorization => {
            let stdin = io::stdin();
            authorize_interactively(&manager, &mut stdin.lock(), open).await?
        }
    };
    output::print_record(&record, mode);
    Ok(CommandStatus::Done)
}

/// Run the authorization step regardless of what is cached.
pub async fn run_login(
    settings: &Settings,
    code: Option<&str>,
    mode: OutputMode,
    open: bool,
) -> Result<CommandStatus, DiscordTokenError> {
    let manager = build_manager(settings)?;
    let record = match code {
        Some(code) => manager.complete_authorization(code).await?,
        None => {
            let stdin = io::stdin();
            authorize_interactively(&manager, &mut stdin.lock(), open).await?
        }
    };
    output::print_record(&record, mode);
    Ok(CommandStatus::Done)
}

pub async fn run_refresh(
    settings: &Settings,
    mode: OutputMode,
) -> Result<CommandStatus, DiscordTokenError> {
    let manager = build_manager(settings)?;
    match manager.force_refresh().await? {
        TokenOutcome::Usable(record) => {
            output::print_record(&record, mode);
            Ok(CommandStatus::Done)
        }
        TokenOutcome::RequiresAuthorization => {
            eprintln!(
                "No token stored at {}. Run: discord-token login",
                settings.token_path.display()
            );
            Ok(CommandStatus::AuthorizationRequired)
        }
    }
}

pub fn run_url(settings: &Settings, open: bool) -> Result<CommandStatus, DiscordTokenError> {
    let url = build_authorization_url(
        &settings.provider_url,
        settings.require_client_id()?,
        &settings.scope,
        &settings.redirect_uri,
    );
    println!("{url}");
    if open {
        open_browser(&url);
    }
    Ok(CommandStatus::Done)
}

/// Describe the stored token without contacting the provider.
pub fn run_show(settings: &Settings, json: bool) -> Result<CommandStatus, DiscordTokenError> {
    let store = TokenStore::new(&settings.token_path);
    let record = store.load()?;
    let now = Utc::now();
    let state = TokenState::of(record.as_ref(), now);

    if json {
        let value = serde_json::json!({
            "path": store.path(),
            "state": state.to_string(),
            "token": record,
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
    } else {
        println!(
            "{}",
            output::format_status(state, record.as_ref(), store.path(), now, output::stdout_is_tty())
        );
    }

    Ok(match state {
        TokenState::NoToken => CommandStatus::AuthorizationRequired,
        _ => CommandStatus::Done,
    })
}

pub fn run_clear(settings: &Settings) -> Result<CommandStatus, DiscordTokenError> {
    let store = TokenStore::new(&settings.token_path);
    if store.clear()? {
        println!("Removed {}", store.path().display());
    } else {
        println!("No token stored at {}", store.path().display());
    }
    Ok(CommandStatus::Done)
}

/// Show the authorization URL, read the code the user pastes back, and
/// exchange it.
pub async fn authorize_interactively(
    manager: &TokenManager,
    reader: &mut impl BufRead,
    open: bool,
) -> Result<TokenRecord, DiscordTokenError> {
    let url = manager.authorization_url();
    let is_tty = output::stderr_is_tty();
    if is_tty {
        eprintln!("Open this URL to authorize:\n{}", url.underline());
    } else {
        eprintln!("Open this URL to authorize:\n{url}");
    }
    if open {
        open_browser(&url);
    }

    let code = prompt(reader, "Enter code: ")?;
    if code.is_empty() {
        return Err(DiscordTokenError::IoError(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "No code provided",
        )));
    }
    manager.complete_authorization(&code).await
}

fn open_browser(url: &str) {
    if webbrowser::open(url).is_err() {
        tracing::warn!("Could not open browser automatically. Please visit:\n{url}");
    }
}

fn prompt(reader: &mut impl BufRead, message: &str) -> Result<String, DiscordTokenError> {
    eprint!("{message}");
    io::stderr().flush()?;
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn settings_in(dir: &tempfile::TempDir) -> Settings {
        Settings {
            client_id: Some("abc".into()),
            client_secret: Some("secret".into()),
            token_path: dir.path().join("access_token"),
            provider_url: "http://127.0.0.1:9".into(),
            timeout: std::time::Duration::from_secs(2),
            ..Settings::default()
        }
    }

    #[test]
    fn prompt_reads_trimmed_line() {
        let mut reader = Cursor::new(b"  abc123  \n".to_vec());
        assert_eq!(prompt(&mut reader, "code: ").unwrap(), "abc123");
    }

    #[test]
    fn prompt_on_eof_is_empty() {
        let mut reader = Cursor::new(Vec::new());
        assert_eq!(prompt(&mut reader, "code: ").unwrap(), "");
    }

    #[tokio::test]
    async fn interactive_without_code_fails_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = build_manager(&settings_in(&dir)).unwrap();
        let mut reader = Cursor::new(b"\n".to_vec());
        let err = authorize_interactively(&manager, &mut reader, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No code provided"));
        assert!(!dir.path().join("access_token").exists());
    }

    #[test]
    fn build_manager_needs_secret() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            client_secret: None,
            ..settings_in(&dir)
        };
        assert!(matches!(
            build_manager(&settings),
            Err(DiscordTokenError::MissingCredential(_))
        ));
    }

    #[test]
    fn url_needs_only_client_id() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            client_secret: None,
            ..settings_in(&dir)
        };
        assert_eq!(run_url(&settings, false).unwrap(), CommandStatus::Done);
    }

    #[test]
    fn show_on_empty_store_requires_authorization() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            run_show(&settings_in(&dir), false).unwrap(),
            CommandStatus::AuthorizationRequired
        );
    }

    #[test]
    fn clear_on_empty_store_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_clear(&settings_in(&dir)).unwrap(), CommandStatus::Done);
    }
}

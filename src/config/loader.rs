use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DiscordTokenError;

use super::env::expand_file_config;
use super::types::{FileConfig, Settings};

pub const CONFIG_ENV: &str = "DISCORD_TOKEN_CONFIG";
pub const PROJECT_CONFIG_FILE: &str = "discord-token.json";

const ENV_CLIENT_ID: &str = "DISCORD_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "DISCORD_CLIENT_SECRET";
const ENV_REDIRECT_URI: &str = "DISCORD_REDIRECT_URI";
const ENV_SCOPE: &str = "DISCORD_SCOPE";
const ENV_TOKEN_PATH: &str = "DISCORD_TOKEN_PATH";
const ENV_PROVIDER_URL: &str = "DISCORD_PROVIDER_URL";
const ENV_TIMEOUT_MS: &str = "DISCORD_TOKEN_TIMEOUT_MS";

/// Values given on the command line. These win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
}

/// Remove `//` line comments and `/* */` block comments outside of strings.
pub fn strip_jsonc_comments(input: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Str,
        StrEscape,
        Line,
        Block,
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Code;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        state = match (state, ch) {
            (State::Code, '"') => {
                out.push(ch);
                State::Str
            }
            (State::Code, '/') if chars.peek() == Some(&'/') => {
                chars.next();
                State::Line
            }
            (State::Code, '/') if chars.peek() == Some(&'*') => {
                chars.next();
                State::Block
            }
            (State::Code, _) => {
                out.push(ch);
                State::Code
            }
            (State::Str, '\\') => {
                out.push(ch);
                State::StrEscape
            }
            (State::Str, '"') => {
                out.push(ch);
                State::Code
            }
            (State::Str, _) | (State::StrEscape, _) => {
                out.push(ch);
                State::Str
            }
            (State::Line, '\n') => {
                out.push('\n');
                State::Code
            }
            (State::Line, _) => State::Line,
            (State::Block, '*') if chars.peek() == Some(&'/') => {
                chars.next();
                State::Code
            }
            // Keep line numbers stable for serde error positions.
            (State::Block, '\n') => {
                out.push('\n');
                State::Block
            }
            (State::Block, _) => State::Block,
        };
    }
    out
}

/// Find the config file to use. First match wins:
///
/// 1. `--config` flag
/// 2. `DISCORD_TOKEN_CONFIG`
/// 3. `./discord-token.json`
/// 4. `~/.discord-token/config.json`
///
/// An explicitly named file that does not exist is an error; the implicit
/// locations are simply skipped.
pub fn discover_config_file(
    cli_config: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<PathBuf>, DiscordTokenError> {
    let explicit = cli_config
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(DiscordTokenError::ConfigError {
                path,
                detail: "file does not exist".into(),
            });
        }
        return Ok(Some(path));
    }

    let project = PathBuf::from(PROJECT_CONFIG_FILE);
    if project.exists() {
        return Ok(Some(project));
    }

    Ok(dirs::home_dir()
        .map(|home| home.join(".discord-token").join("config.json"))
        .filter(|p| p.exists()))
}

/// Read, comment-strip, parse and env-expand a config file.
pub fn read_config_file(path: &Path) -> Result<FileConfig, DiscordTokenError> {
    let content = std::fs::read_to_string(path).map_err(|e| DiscordTokenError::ConfigError {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let mut config: FileConfig = serde_json::from_str(&strip_jsonc_comments(&content))
        .map_err(|e| DiscordTokenError::ConfigError {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    expand_file_config(&mut config, path)?;
    Ok(config)
}

/// Merge all sources. Precedence: overrides, environment, config file, defaults.
pub fn resolve_settings(
    overrides: &Overrides,
    file: Option<(PathBuf, FileConfig)>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Settings, DiscordTokenError> {
    let defaults = Settings::default();
    let (source, file) = match file {
        Some((path, cfg)) => (Some(path), cfg),
        None => (None, FileConfig::default()),
    };
    let env = |key: &str| env(key).filter(|v| !v.is_empty());

    let timeout_ms = match env(ENV_TIMEOUT_MS) {
        Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
            DiscordTokenError::ConfigError {
                path: PathBuf::from("<env>"),
                detail: format!("{ENV_TIMEOUT_MS}={raw}: {e}"),
            }
        })?),
        None => file.timeout_ms,
    };

    Ok(Settings {
        client_id: env(ENV_CLIENT_ID).or(file.client_id),
        client_secret: env(ENV_CLIENT_SECRET).or(file.client_secret),
        redirect_uri: env(ENV_REDIRECT_URI)
            .or(file.redirect_uri)
            .unwrap_or(defaults.redirect_uri),
        scope: env(ENV_SCOPE).or(file.scope).unwrap_or(defaults.scope),
        token_path: overrides
            .token_path
            .clone()
            .or_else(|| env(ENV_TOKEN_PATH).map(PathBuf::from))
            .or(file.token_path)
            .unwrap_or(defaults.token_path),
        provider_url: env(ENV_PROVIDER_URL)
            .or(file.provider_url)
            .unwrap_or(defaults.provider_url),
        timeout: timeout_ms.map(Duration::from_millis).unwrap_or(defaults.timeout),
        source,
    })
}

/// `.env` keys used by older setups of this tool.
const LEGACY_ENV_KEYS: [(&str, &str); 2] = [
    ("client-id", ENV_CLIENT_ID),
    ("client-secret", ENV_CLIENT_SECRET),
];

/// Explain a `.env` parse failure caused by an old-style dashed key.
pub fn legacy_env_key_hint(err: &dotenvy::Error) -> Option<String> {
    let dotenvy::Error::LineParse(line, _) = err else {
        return None;
    };
    let key = line.split('=').next()?.trim();
    LEGACY_ENV_KEYS
        .iter()
        .find(|(legacy, _)| *legacy == key)
        .map(|(legacy, current)| {
            format!(".env key '{legacy}' is no longer read; rename it to {current}")
        })
}

/// Load settings for this process: `.env` first (never overriding variables
/// that are already set), then the config file, then the environment.
pub fn load_settings(overrides: &Overrides) -> Result<Settings, DiscordTokenError> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => match legacy_env_key_hint(&e) {
            Some(hint) => tracing::warn!("{hint}"),
            None => tracing::warn!("Ignoring unreadable .env file: {e}"),
        },
    }

    let env = |key: &str| std::env::var(key).ok();
    let file = match discover_config_file(overrides.config.as_deref(), &env)? {
        Some(path) => {
            tracing::debug!("Using config file {}", path.display());
            let cfg = read_config_file(&path)?;
            Some((path, cfg))
        }
        None => None,
    };
    resolve_settings(overrides, file, &env)
}

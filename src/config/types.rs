use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DiscordTokenError;

pub const DEFAULT_PROVIDER_URL: &str = "https://discord.com";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost";
pub const DEFAULT_SCOPE: &str = "identify";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Shape of the optional JSON config file. Every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    #[serde(default)]
    pub provider_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Everything the provider client needs, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Resolved settings. Credentials stay optional until a command needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
    pub token_path: PathBuf,
    pub provider_url: String,
    pub timeout: Duration,
    /// Config file the settings were read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            token_path: PathBuf::from(crate::oauth::DEFAULT_TOKEN_FILE),
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            source: None,
        }
    }
}

impl Settings {
    pub fn require_client_id(&self) -> Result<&str, DiscordTokenError> {
        non_empty(self.client_id.as_deref())
            .ok_or_else(|| DiscordTokenError::MissingCredential("client id".into()))
    }

    pub fn require_client_secret(&self) -> Result<&str, DiscordTokenError> {
        non_empty(self.client_secret.as_deref())
            .ok_or_else(|| DiscordTokenError::MissingCredential("client secret".into()))
    }

    pub fn provider_config(&self) -> Result<ProviderConfig, DiscordTokenError> {
        Ok(ProviderConfig {
            client_id: self.require_client_id()?.to_string(),
            client_secret: self.require_client_secret()?.to_string(),
            redirect_uri: self.redirect_uri.clone(),
            scope: self.scope.clone(),
            base_url: self.provider_url.clone(),
            timeout: self.timeout,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

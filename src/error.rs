use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DiscordTokenError {
    #[error("{}", format_http("Failed to get user access token", .status, .detail))]
    Exchange { status: Option<u16>, detail: String },

    #[error("{}", format_http("Failed to refresh token", .status, .detail))]
    Refresh { status: Option<u16>, detail: String },

    #[error("Cannot read token file {}: {detail}", path.display())]
    StoreRead { path: PathBuf, detail: String },

    #[error("Cannot write token file {}: {detail}", path.display())]
    StoreWrite { path: PathBuf, detail: String },

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("Missing {0}. Set it in the environment, a .env file, or the config file")]
    MissingCredential(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_http(prefix: &str, status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) if detail.is_empty() => {
            format!("{prefix}: API endpoint returned status code {code}")
        }
        Some(code) => format!("{prefix}: API endpoint returned status code {code}: {detail}"),
        None => format!("{prefix}: {detail}"),
    }
}

impl DiscordTokenError {
    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            DiscordTokenError::Exchange { .. } => "exchange_error",
            DiscordTokenError::Refresh { .. } => "refresh_error",
            DiscordTokenError::StoreRead { .. } => "store_read_error",
            DiscordTokenError::StoreWrite { .. } => "store_write_error",
            DiscordTokenError::ConfigError { .. } => "config_error",
            DiscordTokenError::MissingCredential(_) => "missing_credential",
            DiscordTokenError::IoError(_) => "io_error",
        }
    }

    /// HTTP status reported by the provider, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DiscordTokenError::Exchange { status, .. }
            | DiscordTokenError::Refresh { status, .. } => *status,
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(status) = self.status() {
            obj.insert("status".into(), serde_json::Value::from(status));
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        serde_json::json!({ "error": obj })
    }
}

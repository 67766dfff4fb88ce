use std::path::{Path, PathBuf};

use crate::error::DiscordTokenError;
use crate::oauth::token::TokenRecord;

pub const DEFAULT_TOKEN_FILE: &str = "access_token";

/// File-backed storage for a single [`TokenRecord`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored record. `Ok(None)` means nothing has been saved yet.
    pub fn load(&self) -> Result<Option<TokenRecord>, DiscordTokenError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No token file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(self.read_error(e.to_string())),
        };

        let record: TokenRecord =
            serde_json::from_str(&data).map_err(|e| self.read_error(e.to_string()))?;
        if !record.has_credentials() {
            return Err(self.read_error("stored record has an empty token".into()));
        }
        tracing::debug!("Loaded token from {}", self.path.display());
        Ok(Some(record))
    }

    /// Replace the stored record.
    ///
    /// The record is written to a sibling temp file and renamed over the
    /// target, so readers see either the old record or the new one.
    pub fn save(&self, record: &TokenRecord) -> Result<(), DiscordTokenError> {
        let data = serde_json::to_string_pretty(record)
            .map_err(|e| self.write_error(format!("failed to serialize token: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| self.write_error(format!("failed to create directory: {e}")))?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string());
        let tmp_path = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        if let Err(e) = write_private(&tmp_path, data.as_bytes()) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(self.write_error(e.to_string()));
        }
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(self.write_error(e.to_string()));
        }
        tracing::debug!("Saved token to {}", self.path.display());
        Ok(())
    }

    /// Delete the backing file. Returns `false` when there was nothing to delete.
    pub fn clear(&self) -> Result<bool, DiscordTokenError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.write_error(e.to_string())),
        }
    }

    fn read_error(&self, detail: String) -> DiscordTokenError {
        DiscordTokenError::StoreRead {
            path: self.path.clone(),
            detail,
        }
    }

    fn write_error(&self, detail: String) -> DiscordTokenError {
        DiscordTokenError::StoreWrite {
            path: self.path.clone(),
            detail,
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_FILE)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

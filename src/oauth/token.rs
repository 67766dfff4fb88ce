use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A user access token as issued by the provider.
///
/// Records are only produced from a successful code exchange or refresh and
/// are never mutated afterwards; a refresh yields a replacement record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Expired at or after `expires_at`; the boundary instant counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// The access token formatted for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Both credentials must be present for a record to be usable.
    pub(crate) fn has_credentials(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

impl fmt::Display for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TokenRecord[access_token={}, refresh_token={}, scope={}, expires={}]",
            self.access_token,
            self.refresh_token,
            self.scope,
            self.expires_at.to_rfc3339()
        )
    }
}

/// Raw token response from the provider's token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    scope: Option<String>,
    expires_in: i64,
}

impl TokenResponse {
    /// Build a record issued at `issued_at`. `fallback_scope` is used when the
    /// provider omits `scope`, which it may do on refresh.
    pub(crate) fn into_record(
        self,
        issued_at: DateTime<Utc>,
        fallback_scope: Option<&str>,
    ) -> Result<TokenRecord, String> {
        if self.access_token.is_empty() {
            return Err("response contained an empty access_token".into());
        }
        if self.refresh_token.is_empty() {
            return Err("response contained an empty refresh_token".into());
        }
        let scope = match (self.scope, fallback_scope) {
            (Some(scope), _) => scope,
            (None, Some(previous)) => previous.to_string(),
            (None, None) => return Err("response is missing scope".into()),
        };
        if self.expires_in <= 0 {
            return Err(format!("expires_in must be positive, got {}", self.expires_in));
        }
        let lifetime = Duration::try_seconds(self.expires_in)
            .ok_or_else(|| format!("expires_in out of range: {}", self.expires_in))?;
        let expires_at = issued_at
            .checked_add_signed(lifetime)
            .ok_or_else(|| format!("expires_in out of range: {}", self.expires_in))?;
        Ok(TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            scope,
            expires_at,
        })
    }
}

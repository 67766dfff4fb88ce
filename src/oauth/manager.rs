use chrono::{DateTime, Utc};

use crate::error::DiscordTokenError;
use crate::oauth::client::ProviderClient;
use crate::oauth::store::TokenStore;
use crate::oauth::token::TokenRecord;

/// Result of asking for a token that can be used right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Usable(TokenRecord),
    /// Nothing is cached: the user has to grant a new authorization code.
    RequiresAuthorization,
}

/// Validity of the stored record at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    Valid,
    Expired,
}

impl TokenState {
    pub fn of(record: Option<&TokenRecord>, now: DateTime<Utc>) -> Self {
        match record {
            None => TokenState::NoToken,
            Some(record) if record.is_expired_at(now) => TokenState::Expired,
            Some(_) => TokenState::Valid,
        }
    }
}

impl std::fmt::Display for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TokenState::NoToken => "no token",
            TokenState::Valid => "valid",
            TokenState::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Coordinates the token store and the provider client so callers only ever
/// see a usable token, a request to authorize, or an error.
pub struct TokenManager {
    client: ProviderClient,
    store: TokenStore,
}

impl TokenManager {
    pub fn new(client: ProviderClient, store: TokenStore) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn authorization_url(&self) -> String {
        self.client.authorization_url()
    }

    pub async fn get_usable_token(&self) -> Result<TokenOutcome, DiscordTokenError> {
        self.get_usable_token_at(Utc::now()).await
    }

    /// Return the stored token if it is valid at `now`, refreshing it first
    /// when it has expired.
    ///
    /// A failed refresh leaves the stored record in place so a later call can
    /// retry with the same refresh token.
    pub async fn get_usable_token_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<TokenOutcome, DiscordTokenError> {
        let Some(record) = self.store.load()? else {
            return Ok(TokenOutcome::RequiresAuthorization);
        };

        if !record.is_expired_at(now) {
            return Ok(TokenOutcome::Usable(record));
        }

        tracing::info!(expired_at = %record.expires_at, "Access token expired, refreshing");
        self.refresh_and_store(&record).await.map(TokenOutcome::Usable)
    }

    /// Exchange an authorization code and persist the resulting record.
    /// Nothing is written if the exchange fails.
    pub async fn complete_authorization(
        &self,
        code: &str,
    ) -> Result<TokenRecord, DiscordTokenError> {
        let record = self.client.exchange_code(code.trim()).await?;
        self.store.save(&record)?;
        tracing::info!(path = %self.store.path().display(), "Stored new access token");
        Ok(record)
    }

    /// Refresh the stored record whether or not it has expired.
    pub async fn force_refresh(&self) -> Result<TokenOutcome, DiscordTokenError> {
        let Some(record) = self.store.load()? else {
            return Ok(TokenOutcome::RequiresAuthorization);
        };
        self.refresh_and_store(&record).await.map(TokenOutcome::Usable)
    }

    async fn refresh_and_store(
        &self,
        previous: &TokenRecord,
    ) -> Result<TokenRecord, DiscordTokenError> {
        let record = self.client.refresh(previous).await?;
        self.store.save(&record)?;
        tracing::info!(path = %self.store.path().display(), "Stored refreshed access token");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use chrono::{Duration, TimeZone};

    // Port 9 (discard) is never listening locally, so any request fails fast.
    fn offline_manager(dir: &tempfile::TempDir) -> TokenManager {
        let client = ProviderClient::new(ProviderConfig {
            client_id: "abc".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost".into(),
            scope: "identify".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout: std::time::Duration::from_secs(2),
        })
        .unwrap();
        TokenManager::new(client, TokenStore::new(dir.path().join("access_token")))
    }

    fn record_expiring_at(expires_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            access_token: "A".into(),
            refresh_token: "R".into(),
            scope: "identify".into(),
            expires_at,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn no_record_requires_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let manager = offline_manager(&dir);
        assert_eq!(
            manager.get_usable_token().await.unwrap(),
            TokenOutcome::RequiresAuthorization
        );
    }

    #[tokio::test]
    async fn valid_record_is_returned_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let manager = offline_manager(&dir);
        let record = record_expiring_at(t0() + Duration::seconds(600));
        manager.store().save(&record).unwrap();

        let outcome = manager
            .get_usable_token_at(t0() + Duration::seconds(599))
            .await
            .unwrap();
        assert_eq!(outcome, TokenOutcome::Usable(record));
    }

    #[tokio::test]
    async fn boundary_instant_triggers_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let manager = offline_manager(&dir);
        let record = record_expiring_at(t0() + Duration::seconds(600));
        manager.store().save(&record).unwrap();

        let err = manager
            .get_usable_token_at(t0() + Duration::seconds(600))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscordTokenError::Refresh { status: None, .. }));
        assert_eq!(manager.store().load().unwrap(), Some(record));
    }

    #[tokio::test]
    async fn corrupted_store_surfaces_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = offline_manager(&dir);
        std::fs::write(manager.store().path(), "not json").unwrap();
        let err = manager.get_usable_token().await.unwrap_err();
        assert_eq!(err.code(), "store_read_error");
    }

    #[tokio::test]
    async fn force_refresh_without_record_requires_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let manager = offline_manager(&dir);
        assert_eq!(
            manager.force_refresh().await.unwrap(),
            TokenOutcome::RequiresAuthorization
        );
    }

    #[tokio::test]
    async fn failed_exchange_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = offline_manager(&dir);
        let err = manager.complete_authorization("code").await.unwrap_err();
        assert_eq!(err.code(), "exchange_error");
        assert!(!manager.store().path().exists());
    }

    #[test]
    fn state_classification() {
        let record = record_expiring_at(t0() + Duration::seconds(10));
        assert_eq!(TokenState::of(None, t0()), TokenState::NoToken);
        assert_eq!(TokenState::of(Some(&record), t0()), TokenState::Valid);
        assert_eq!(
            TokenState::of(Some(&record), t0() + Duration::seconds(10)),
            TokenState::Expired
        );
    }

    #[test]
    fn state_display() {
        assert_eq!(TokenState::NoToken.to_string(), "no token");
        assert_eq!(TokenState::Expired.to_string(), "expired");
    }
}

use chrono::Utc;
use reqwest::StatusCode;

use crate::config::ProviderConfig;
use crate::error::DiscordTokenError;
use crate::oauth::token::{TokenRecord, TokenResponse};

const AUTHORIZE_PATH: &str = "/oauth2/authorize";
const TOKEN_PATH: &str = "/api/v10/oauth2/token";

/// Build the browser URL that asks the user to grant an authorization code.
///
/// Values are inserted as given; the parameter order is fixed.
pub fn build_authorization_url(
    base_url: &str,
    client_id: &str,
    scope: &str,
    redirect_uri: &str,
) -> String {
    format!(
        "{}{AUTHORIZE_PATH}?response_type=code&client_id={client_id}&scope={scope}&redirect_uri={redirect_uri}",
        base_url.trim_end_matches('/'),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    AuthorizationCode,
    RefreshToken,
}

impl Grant {
    fn error(self, status: Option<u16>, detail: String) -> DiscordTokenError {
        match self {
            Grant::AuthorizationCode => DiscordTokenError::Exchange { status, detail },
            Grant::RefreshToken => DiscordTokenError::Refresh { status, detail },
        }
    }
}

/// HTTP client for the provider's OAuth2 endpoints.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Result<Self, DiscordTokenError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DiscordTokenError::ConfigError {
                path: std::path::PathBuf::from("<http-client>"),
                detail: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    pub fn authorization_url(&self) -> String {
        build_authorization_url(
            &self.config.base_url,
            &self.config.client_id,
            &self.config.scope,
            &self.config.redirect_uri,
        )
    }

    fn token_endpoint(&self) -> String {
        format!("{}{TOKEN_PATH}", self.config.base_url.trim_end_matches('/'))
    }

    /// Exchange a one-time authorization code for a token record.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenRecord, DiscordTokenError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        self.request_token(Grant::AuthorizationCode, &form, None).await
    }

    /// Mint a new record from `previous`'s refresh token.
    ///
    /// The returned record carries whatever refresh token the provider sent
    /// back; callers must store it in place of the old one.
    pub async fn refresh(&self, previous: &TokenRecord) -> Result<TokenRecord, DiscordTokenError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", previous.refresh_token.as_str()),
        ];
        self.request_token(Grant::RefreshToken, &form, Some(&previous.scope))
            .await
    }

    async fn request_token(
        &self,
        grant: Grant,
        form: &[(&str, &str)],
        fallback_scope: Option<&str>,
    ) -> Result<TokenRecord, DiscordTokenError> {
        let endpoint = self.token_endpoint();
        tracing::debug!(?grant, %endpoint, "Requesting token");

        let resp = self
            .http
            .post(&endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| grant.error(None, describe_transport_error(&e)))?;

        let issued_at = Utc::now();
        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(?grant, %status, "Token endpoint rejected request");
            return Err(grant.error(Some(status.as_u16()), body.trim().to_string()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| grant.error(None, format!("failed to read response body: {e}")))?;
        let token_resp: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| grant.error(None, format!("failed to parse token response: {e}")))?;
        let record = token_resp
            .into_record(issued_at, fallback_scope)
            .map_err(|detail| grant.error(None, detail))?;

        tracing::info!(?grant, expires_at = %record.expires_at, "Token issued");
        Ok(record)
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else {
        format!("request failed: {e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_exact_format() {
        let url = build_authorization_url("https://discord.com", "abc", "identify", "http://localhost");
        assert_eq!(
            url,
            "https://discord.com/oauth2/authorize?response_type=code&client_id=abc&scope=identify&redirect_uri=http://localhost"
        );
    }

    #[test]
    fn authorization_url_trims_trailing_slash() {
        let url = build_authorization_url("https://discord.com/", "abc", "identify", "http://localhost");
        assert!(url.starts_with("https://discord.com/oauth2/authorize?"));
    }

    #[test]
    fn authorization_url_inserts_values_verbatim() {
        let url = build_authorization_url("https://x", "1", "identify email", "http://localhost:8080/cb");
        assert!(url.ends_with("scope=identify email&redirect_uri=http://localhost:8080/cb"));
    }

    #[test]
    fn client_uses_configured_values() {
        let client = ProviderClient::new(ProviderConfig {
            client_id: "abc".into(),
            client_secret: "s".into(),
            redirect_uri: "http://localhost".into(),
            scope: "identify".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout: std::time::Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            client.authorization_url(),
            "http://127.0.0.1:9/oauth2/authorize?response_type=code&client_id=abc&scope=identify&redirect_uri=http://localhost"
        );
        assert_eq!(client.token_endpoint(), "http://127.0.0.1:9/api/v10/oauth2/token");
    }

    #[test]
    fn grant_maps_to_error_kind() {
        assert_eq!(Grant::AuthorizationCode.error(None, "x".into()).code(), "exchange_error");
        assert_eq!(Grant::RefreshToken.error(Some(401), "x".into()).code(), "refresh_error");
    }
}

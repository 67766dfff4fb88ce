use std::path::Path;
use std::time::Duration;

use discord_token::{ProviderClient, ProviderConfig, TokenManager, TokenStore};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/api/v10/oauth2/token";

/// Provider config pointing at a mock server with fixture credentials.
#[allow(dead_code)]
pub fn provider_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        client_id: "abc".into(),
        client_secret: "shh".into(),
        redirect_uri: "http://localhost".into(),
        scope: "identify".into(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    }
}

#[allow(dead_code)]
pub fn manager(server: &MockServer, token_file: &Path) -> TokenManager {
    let client = ProviderClient::new(provider_config(&server.uri())).unwrap();
    TokenManager::new(client, TokenStore::new(token_file))
}

pub fn token_body(access: &str, refresh: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "token_type": "Bearer",
        "access_token": access,
        "refresh_token": refresh,
        "scope": "identify",
        "expires_in": expires_in,
    })
}

/// Respond to an authorization-code exchange for `code`.
#[allow(dead_code)]
pub async fn mount_exchange(server: &MockServer, code: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Respond to a refresh using `refresh_token`.
#[allow(dead_code)]
pub async fn mount_refresh(server: &MockServer, refresh_token: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("refresh_token={refresh_token}")))
        .respond_with(response)
        .mount(server)
        .await;
}

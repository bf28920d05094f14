//! Salla OAuth2 token refresh.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::SallaError;

/// Salla OAuth2 token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://accounts.salla.sa/oauth2/token";

const REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Access and refresh token pair.
#[derive(Debug, Clone, Default)]
pub struct SallaToken {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    /// Unix timestamp when the access token expires, when known.
    pub expires_at: Option<i64>,
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl SallaToken {
    /// Apply a refresh response, keeping the old refresh token when Salla does
    /// not rotate it.
    fn refreshed(&self, response: TokenResponse, now: i64) -> Self {
        Self {
            access_token: Some(SecretString::from(response.access_token)),
            refresh_token: response
                .refresh_token
                .map(SecretString::from)
                .or_else(|| self.refresh_token.clone()),
            expires_at: response.expires_in.map(|secs| now.saturating_add(secs)),
        }
    }

    /// Whether a refresh can be attempted.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Exchange the refresh token for a new access token.
///
/// # Errors
///
/// Returns `SallaError::NoAccessToken` without a refresh token and
/// `SallaError::AuthenticationFailed` if Salla rejects it.
#[instrument(skip_all, fields(client_id = %client_id))]
pub async fn refresh_access_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &SecretString,
    token: &SallaToken,
) -> Result<SallaToken, SallaError> {
    let refresh_token = token.refresh_token.as_ref().ok_or(SallaError::NoAccessToken)?;
    let now = chrono::Utc::now().timestamp();

    let response = client
        .post(TOKEN_ENDPOINT)
        .timeout(REFRESH_TIMEOUT)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
            ("refresh_token", refresh_token.expose_secret()),
        ])
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        let body: TokenResponse = response.json().await?;
        tracing::info!("Refreshed Salla access token");
        return Ok(token.refreshed(body, now));
    }

    let message = response
        .json::<TokenErrorResponse>()
        .await
        .ok()
        .and_then(|e| e.error_description.or(e.error))
        .unwrap_or_else(|| format!("HTTP {status}"));

    Err(SallaError::AuthenticationFailed(format!(
        "Token refresh failed: {message}"
    )))
}

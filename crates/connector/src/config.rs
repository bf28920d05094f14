//! Connector configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHANNEL_SYNC_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `WEBHOOK_SECRET` - Bearer token Salla sends in the `Authorization` header
//!
//! ## Optional
//! - `CHANNEL_SYNC_HOST` - Bind address (default: 127.0.0.1)
//! - `CHANNEL_SYNC_PORT` - Listen port (default: 3002)
//! - `CHANNEL_ID` - Channel served by the webhook (default: 1)
//! - `WEBHOOK_ORDER_MODE` / `WEBHOOK_CUSTOMER_MODE` / `WEBHOOK_PRODUCT_MODE` -
//!   `webhook` (default), `api` or `disabled`
//! - `DEFAULT_CURRENCY` - Currency for orders that omit one (default: SAR)
//! - `DEFAULT_COUNTRY` - Country for addresses that omit one (default: SA)
//! - `APPLY_ITEM_DISCOUNTS` - Carry per-item discount percentages (default: true)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (Salla REST API - required for `api` mode and status push)
//! - `SALLA_CLIENT_ID` - OAuth client ID
//! - `SALLA_CLIENT_SECRET` - OAuth client secret
//! - `SALLA_ACCESS_TOKEN` - Current access token
//! - `SALLA_REFRESH_TOKEN` - Refresh token
//! - `SALLA_API_BASE` - API base URL (default: <https://api.salla.dev/admin/v2/>)
//!
//! ## Optional (Omniful fulfillment - imported orders are forwarded when set)
//! - `OMNIFUL_ACCESS_TOKEN` - Sales channel access token
//! - `OMNIFUL_HUB_CODE` - Hub that fulfills the orders
//! - `OMNIFUL_API_BASE` - API base URL (default: <https://api.omniful.com/sales-channel/public/v1/>)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use channel_sync_core::{ChannelId, CurrencyCode};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::normalize::NormalizerConfig;

const MIN_WEBHOOK_SECRET_LENGTH: usize = 24;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
pub const DEFAULT_SALLA_API_BASE: &str = "https://api.salla.dev/admin/v2/";

/// Default Omniful sales channel API base.
pub const DEFAULT_OMNIFUL_API_BASE: &str = "https://api.omniful.com/sales-channel/public/v1/";

/// Substrings that mark a secret as a copy-pasted placeholder (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How an incoming webhook event of one kind is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WebhookMode {
    /// Import straight from the webhook body.
    #[default]
    Webhook,
    /// Use the webhook only as a trigger and fetch the record from the API.
    Api,
    /// Acknowledge and ignore.
    Disabled,
}

impl FromStr for WebhookMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webhook" | "active_webhook" => Ok(Self::Webhook),
            "api" | "active_api" => Ok(Self::Api),
            "disabled" | "off" => Ok(Self::Disabled),
            other => Err(format!("expected webhook, api or disabled, got {other}")),
        }
    }
}

/// Per-object webhook handling.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookModes {
    pub order: WebhookMode,
    pub customer: WebhookMode,
    pub product: WebhookMode,
}

/// Connector configuration.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shared bearer token expected on webhook calls
    pub webhook_secret: SecretString,
    /// Channel the webhook endpoint imports into
    pub channel_id: ChannelId,
    /// Per-object webhook handling
    pub webhook_modes: WebhookModes,
    /// Salla REST API access (optional)
    pub salla: Option<SallaConfig>,
    /// Omniful fulfillment access (optional)
    pub omniful: Option<OmnifulConfig>,
    /// Payload normalization defaults
    pub normalizer: NormalizerConfig,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Salla OAuth application and token configuration.
///
/// Implements `Debug` manually to redact credentials.
#[derive(Clone)]
pub struct SallaConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub api_base: Url,
}

impl std::fmt::Debug for SallaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SallaConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

impl SallaConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let client_id = get_optional_env("SALLA_CLIENT_ID");
        let client_secret = get_optional_env("SALLA_CLIENT_SECRET");

        let (client_id, client_secret) = match (client_id, client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            (None, None) => return Ok(None),
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "SALLA_CLIENT_*".to_string(),
                    "Both SALLA_CLIENT_ID and SALLA_CLIENT_SECRET must be set together".to_string(),
                ));
            }
        };
        validate_secret_strength(&client_secret, "SALLA_CLIENT_SECRET")?;

        let api_base = parse_api_base(
            "SALLA_API_BASE",
            &get_env_or_default("SALLA_API_BASE", DEFAULT_SALLA_API_BASE),
        )?;

        Ok(Some(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            access_token: get_optional_env("SALLA_ACCESS_TOKEN").map(SecretString::from),
            refresh_token: get_optional_env("SALLA_REFRESH_TOKEN").map(SecretString::from),
            api_base,
        }))
    }
}

/// Omniful sales channel configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct OmnifulConfig {
    pub access_token: SecretString,
    pub hub_code: String,
    pub api_base: Url,
}

impl std::fmt::Debug for OmnifulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmnifulConfig")
            .field("access_token", &"[REDACTED]")
            .field("hub_code", &self.hub_code)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

impl OmnifulConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let access_token = get_optional_env("OMNIFUL_ACCESS_TOKEN");
        let hub_code = get_optional_env("OMNIFUL_HUB_CODE");

        let (access_token, hub_code) = match (access_token, hub_code) {
            (Some(token), Some(hub)) => (token, hub),
            (None, None) => return Ok(None),
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "OMNIFUL_*".to_string(),
                    "Both OMNIFUL_ACCESS_TOKEN and OMNIFUL_HUB_CODE must be set together"
                        .to_string(),
                ));
            }
        };

        let api_base = parse_api_base(
            "OMNIFUL_API_BASE",
            &get_env_or_default("OMNIFUL_API_BASE", DEFAULT_OMNIFUL_API_BASE),
        )?;

        Ok(Some(Self {
            access_token: SecretString::from(access_token),
            hub_code,
            api_base,
        }))
    }
}

impl ConnectorConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the webhook secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let webhook_secret = get_required_env("WEBHOOK_SECRET")?;
        validate_webhook_secret(&webhook_secret)?;
        Self::load(SecretString::from(webhook_secret))
    }

    /// Load configuration for offline tooling (the CLI).
    ///
    /// Same as [`Self::from_env`] except that `WEBHOOK_SECRET` is neither
    /// required nor read.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn for_tools() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(SecretString::from(String::new()))
    }

    fn load(webhook_secret: SecretString) -> Result<Self, ConfigError> {
        let database_url = get_database_url("CHANNEL_SYNC_DATABASE_URL")?;
        let host = parse_env("CHANNEL_SYNC_HOST", "127.0.0.1")?;
        let port = parse_env("CHANNEL_SYNC_PORT", "3002")?;
        let channel_id = ChannelId::new(parse_env("CHANNEL_ID", "1")?);

        let webhook_modes = WebhookModes {
            order: parse_env("WEBHOOK_ORDER_MODE", "webhook")?,
            customer: parse_env("WEBHOOK_CUSTOMER_MODE", "webhook")?,
            product: parse_env("WEBHOOK_PRODUCT_MODE", "webhook")?,
        };

        let normalizer = NormalizerConfig {
            default_currency: parse_env::<CurrencyCode>("DEFAULT_CURRENCY", "SAR")?,
            default_country: get_env_or_default("DEFAULT_COUNTRY", "SA").to_ascii_uppercase(),
            apply_item_discounts: parse_env("APPLY_ITEM_DISCOUNTS", "true")?,
            ..NormalizerConfig::default()
        };

        Ok(Self {
            database_url,
            host,
            port,
            webhook_secret,
            channel_id,
            webhook_modes,
            salla: SallaConfig::from_env()?,
            omniful: OmnifulConfig::from_env()?,
            normalizer,
            json_logs: get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_optional_env("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            sentry_traces_sample_rate: get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
        })
    }

    /// Configuration with every optional setting at its default.
    ///
    /// Used by tests, which do not go through the environment.
    #[must_use]
    pub fn with_defaults(database_url: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            database_url,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3002,
            webhook_secret,
            channel_id: ChannelId::new(1),
            webhook_modes: WebhookModes::default(),
            salla: None,
            omniful: None,
            normalizer: NormalizerConfig::default(),
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the Salla configuration, if set.
    #[must_use]
    pub const fn salla(&self) -> Option<&SallaConfig> {
        self.salla.as_ref()
    }

    /// Returns the Omniful configuration, if set.
    #[must_use]
    pub const fn omniful(&self) -> Option<&OmnifulConfig> {
        self.omniful.as_ref()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the API base, forcing a trailing slash so relative joins keep the path.
fn parse_api_base(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_webhook_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_WEBHOOK_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            "WEBHOOK_SECRET".to_string(),
            format!(
                "must be at least {MIN_WEBHOOK_SECRET_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }
    validate_secret_strength(secret, "WEBHOOK_SECRET")
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_default() += 1;
    }

    #[allow(clippy::cast_precision_loss)] // secrets are far shorter than 2^52 chars
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder-looking or low-entropy secrets.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Expose a secret for comparison without cloning it into a `String`.
pub(crate) fn secret_bytes(secret: &SecretString) -> &[u8] {
    secret.expose_secret().as_bytes()
}

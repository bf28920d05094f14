//! Salla merchant REST API client.
//!
//! Used when a webhook only triggers an import (`api` mode), to push status
//! changes back to the store, and by the CLI to fetch orders and the status
//! catalog.
//!
//! # Architecture
//!
//! - OAuth2 bearer tokens, refreshed on the first 401 and retried once
//! - Token state shared behind a `tokio::sync::RwLock`
//! - Responses are unwrapped from Salla's `{"status", "success", "data"}` shell

pub mod auth;
pub mod client;

pub use client::{SallaClient, StatusPusher};

use thiserror::Error;

/// Errors that can occur when talking to Salla.
#[derive(Debug, Error)]
pub enum SallaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Salla.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Token refresh was rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No access token and no way to get one.
    #[error("No access token - Salla authorization required")]
    NoAccessToken,

    /// Any other non-success response.
    #[error("Salla API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

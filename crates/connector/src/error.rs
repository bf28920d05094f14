//! Unified error handling for the connector HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::payload::PayloadError;
use crate::salla::SallaError;
use crate::services::ImportError;

/// Application-level error type for the connector.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Salla API operation failed.
    #[error("Salla error: {0}")]
    Salla(#[from] SallaError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request payload.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Salla(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::ChannelNotFound(id) => Self::NotFound(format!("channel {id}")),
            ImportError::Database(e) => Self::Database(e),
            ImportError::Tax(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Salla(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Connector request error"
            );
        } else if matches!(self, Self::BadRequest(_)) {
            tracing::warn!(error = %self, "Rejected webhook payload");
        }

        let status = self.status_code();

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Unauthorized(_) => json!({"status": "unauthorized"}),
            Self::Database(_) | Self::Internal(_) => {
                json!({"status": "error", "error": "Internal server error"})
            }
            Self::Salla(_) => json!({"status": "error", "error": "External service error"}),
            _ => json!({"status": "error", "error": self.to_string()}),
        };

        (status, Json(body)).into_response()
    }
}

//! Salla webhook handler.
//!
//! Every call is authorized with the shared secret, then dispatched on the
//! event name. Order imports that end with the feed in `error` still answer
//! `success`: the failure is recorded on the feed for a later retry.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::config::{WebhookMode, secret_bytes};
use crate::db::Store;
use crate::error::AppError;
use crate::normalize::normalize_order;
use crate::payload::{EventKind, PayloadError, SallaOrder, WebhookEnvelope};
use crate::salla::SallaClient;
use crate::services::{partners, products};
use crate::state::AppState;

/// Create webhook routes.
pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/salla/webhook", post(salla_webhook::<S>))
}

/// Handle one Salla webhook call.
#[instrument(skip_all)]
async fn salla_webhook<S: Store>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    authorize(&headers, secret_bytes(&state.config().webhook_secret))?;

    let envelope = match WebhookEnvelope::parse(&body) {
        Ok(envelope) => envelope,
        Err(PayloadError::Empty) => {
            tracing::warn!("Webhook without data");
            return Ok(status_response(StatusCode::BAD_REQUEST, "no data"));
        }
        Err(e) => return Err(e.into()),
    };

    let kind = envelope.kind();
    tracing::info!(event = %envelope.event, kind = kind.as_str(), "Received Salla webhook");

    match kind {
        EventKind::Order => import_order(&state, &envelope).await,
        EventKind::Customer => upsert_customer(&state, &envelope).await,
        EventKind::Product => upsert_product(&state, &envelope).await,
        EventKind::Other => {
            tracing::debug!(event = %envelope.event, "Ignoring event");
            Ok(success())
        }
    }
}

async fn import_order<S: Store>(
    state: &AppState<S>,
    envelope: &WebhookEnvelope,
) -> Result<Response, AppError> {
    let config = state.config();
    let (order, source) = match config.webhook_modes.order {
        WebhookMode::Disabled => return Ok(disabled(EventKind::Order)),
        WebhookMode::Webhook => (envelope.order()?, "webhook"),
        WebhookMode::Api => (fetch_order(state, envelope).await?, "api"),
    };

    let feed = normalize_order(
        &order,
        envelope.created_at.as_deref(),
        source,
        &config.normalizer,
    )?;

    let channel = state
        .store()
        .get_channel(config.channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("channel {}", config.channel_id)))?;

    if let Some(date) = feed.date_order
        && channel.is_before_start(date.with_timezone(&Utc))
    {
        tracing::info!(store_id = %feed.store_id, %date, "Order predates channel start date");
        return Ok(status_response(StatusCode::OK, "rejected"));
    }

    let outcome = state.importer().import_feed(channel.id, &feed).await?;
    tracing::info!(
        store_id = %feed.store_id,
        feed_id = %outcome.feed_id,
        state = %outcome.state,
        "Order webhook processed"
    );
    Ok(success())
}

async fn fetch_order<S: Store>(
    state: &AppState<S>,
    envelope: &WebhookEnvelope,
) -> Result<SallaOrder, AppError> {
    let id = envelope.data_id().ok_or(PayloadError::MissingField("id"))?;
    Ok(api_client(state)?.get_order_with_items(&id).await?)
}

async fn upsert_customer<S: Store>(
    state: &AppState<S>,
    envelope: &WebhookEnvelope,
) -> Result<Response, AppError> {
    let config = state.config();
    let customer = match config.webhook_modes.customer {
        WebhookMode::Disabled => return Ok(disabled(EventKind::Customer)),
        WebhookMode::Webhook => envelope.customer()?,
        WebhookMode::Api => {
            let id = envelope.data_id().ok_or(PayloadError::MissingField("id"))?;
            api_client(state)?.get_customer(&id).await?
        }
    };

    partners::upsert_customer(state.store(), config.channel_id, &customer, &config.normalizer)
        .await?;
    Ok(success())
}

async fn upsert_product<S: Store>(
    state: &AppState<S>,
    envelope: &WebhookEnvelope,
) -> Result<Response, AppError> {
    let config = state.config();
    let product = match config.webhook_modes.product {
        WebhookMode::Disabled => return Ok(disabled(EventKind::Product)),
        WebhookMode::Webhook => envelope.product()?,
        WebhookMode::Api => {
            let id = envelope.data_id().ok_or(PayloadError::MissingField("id"))?;
            api_client(state)?.get_product(&id).await?
        }
    };

    products::upsert_product(state.store(), config.channel_id, &product, &config.normalizer)
        .await?;
    Ok(success())
}

fn api_client<S: Store>(state: &AppState<S>) -> Result<&SallaClient, AppError> {
    state
        .salla()
        .ok_or_else(|| AppError::Internal("Salla API is not configured".to_string()))
}

/// Check the `Authorization` header against the shared secret.
///
/// Only the last whitespace-separated token counts, so both `Bearer <secret>`
/// and a bare secret are accepted.
fn authorize(headers: &HeaderMap, secret: &[u8]) -> Result<(), AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_whitespace().last())
        .ok_or_else(|| AppError::Unauthorized("missing authorization".to_string()))?;

    if constant_time_eq(token.as_bytes(), secret) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("invalid webhook token".to_string()))
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn status_response(status: StatusCode, label: &str) -> Response {
    (status, Json(json!({ "status": label }))).into_response()
}

fn success() -> Response {
    status_response(StatusCode::OK, "success")
}

fn disabled(kind: EventKind) -> Response {
    tracing::info!(kind = kind.as_str(), "Webhook handling disabled for event kind");
    success()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authorize_uses_last_token() {
        assert!(authorize(&headers("Bearer s3cr3t-value"), b"s3cr3t-value").is_ok());
        assert!(authorize(&headers("s3cr3t-value"), b"s3cr3t-value").is_ok());
        assert!(authorize(&headers("Bearer wrong"), b"s3cr3t-value").is_err());
        assert!(authorize(&HeaderMap::new(), b"s3cr3t-value").is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(constant_time_eq(b"", b""));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
    }
}

//! HTTP routes for the connector.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (storage reachable)
//! POST /salla/webhook          - Salla order, customer and product events
//! ```

pub mod webhook;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::db::Store;
use crate::state::AppState;

/// Build the connector routes without middleware.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .merge(webhook::router())
}

/// Build the full application: routes, request tracing and Sentry layers.
pub fn app<S: Store>(state: AppState<S>) -> Router {
    routes()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage is not reachable.
async fn readiness<S: Store>(State(state): State<AppState<S>>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response};
    use chrono::{TimeZone, Utc};
    use channel_sync_core::{ChannelId, ChannelKind, CurrencyCode, DefaultTaxType, NO_VARIANTS};
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ConnectorConfig, WebhookMode};
    use crate::db::MemoryStore;
    use crate::models::{Channel, NewProduct, ProductMapping};
    use crate::services::StrategyRegistry;

    const SECRET: &str = "test-webhook-secret-0123456789";

    fn channel(start: Option<chrono::DateTime<Utc>>) -> Channel {
        Channel {
            id: ChannelId::new(1),
            kind: ChannelKind::Salla,
            name: "Salla".to_string(),
            default_tax_type: DefaultTaxType::Exclude,
            tax_on_discount_line: false,
            use_store_order_name: false,
            order_start_date: start,
            delivery_product_id: None,
            discount_product_id: None,
            cod_product_id: None,
            company_currency: CurrencyCode::SAR,
        }
    }

    async fn setup(
        start: Option<chrono::DateTime<Utc>>,
        tweak: impl FnOnce(&mut ConnectorConfig),
    ) -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        store.insert_channel(channel(start)).await;
        store.insert_currency(CurrencyCode::SAR, true).await;
        let oil = store
            .create_product(&NewProduct {
                name: "Oud Oil".to_string(),
                list_price: Decimal::from(100),
                ..NewProduct::default()
            })
            .await
            .unwrap();
        store
            .upsert_product_mapping(&ProductMapping {
                channel_id: ChannelId::new(1),
                store_product_id: "10".to_string(),
                store_variant_id: NO_VARIANTS.to_string(),
                product_id: oil.id,
                default_code: None,
                barcode: None,
            })
            .await
            .unwrap();

        let mut config = ConnectorConfig::with_defaults(
            SecretString::from("postgres://unused"),
            SecretString::from(SECRET),
        );
        tweak(&mut config);
        let state = AppState::with_parts(config, Arc::clone(&store), None, StrategyRegistry::new());
        (store, app(state))
    }

    fn order_event() -> Value {
        json!({
            "event": "order.created",
            "merchant": 1_305_146_709,
            "created_at": "2024-03-02 14:05:11",
            "data": {
                "id": 2_093_117_510_i64,
                "reference_id": 64_543_212,
                "currency": "SAR",
                "date": {"date": "2024-03-02 14:05:11.000000", "timezone": "Asia/Riyadh"},
                "status": {"slug": "under_review", "name": "Under review"},
                "payment_method": "cod",
                "customer": {
                    "id": 1_227_534_533,
                    "first_name": "Sara",
                    "last_name": "Al Harbi",
                    "mobile": 555_123_456,
                    "mobile_code": "+966"
                },
                "shipping": {
                    "company": {"name": "SMSA"},
                    "address": {"street_number": "12", "city": "Riyadh", "country_code": "SA"}
                },
                "items": [{
                    "name": "Oud Oil",
                    "quantity": 1,
                    "product": {"id": 10},
                    "amounts": {"price_without_tax": {"amount": 100}, "tax": {"percent": 15}}
                }],
                "amounts": {"shipping_cost": {"amount": 25}, "total": {"amount": 143.75}}
            }
        })
    }

    fn post(body: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/salla/webhook")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (_, app) = setup(None, |_| {}).await;
        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejects_missing_or_wrong_token() {
        let (store, app) = setup(None, |_| {}).await;
        let body = order_event().to_string();

        let response = app.clone().oneshot(post(&body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({"status": "unauthorized"}));

        let response = app.oneshot(post(&body, Some("nope"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(store.feeds().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_no_data() {
        let (_, app) = setup(None, |_| {}).await;
        for body in ["", "{}"] {
            let response = app.clone().oneshot(post(body, Some(SECRET))).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await, json!({"status": "no data"}));
        }

        let response = app.oneshot(post("not json", Some(SECRET))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_order_event_imports_order() {
        let (store, app) = setup(None, |_| {}).await;
        let response = app
            .oneshot(post(&order_event().to_string(), Some(SECRET)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "success"}));

        let feeds = store.feeds().await;
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].order.store_id, "2093117510");
        let orders = store.sale_orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].name, "64543212");
        assert_eq!(store.order_mappings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_order_before_start_date_is_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let (store, app) = setup(Some(start), |_| {}).await;
        let response = app
            .oneshot(post(&order_event().to_string(), Some(SECRET)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "rejected"}));
        assert!(store.feeds().await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_order_mode_acknowledges() {
        let (store, app) = setup(None, |config| {
            config.webhook_modes.order = WebhookMode::Disabled;
        })
        .await;
        let response = app
            .oneshot(post(&order_event().to_string(), Some(SECRET)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.feeds().await.is_empty());
    }

    #[tokio::test]
    async fn test_api_mode_without_client_fails() {
        let (store, app) = setup(None, |config| {
            config.webhook_modes.order = WebhookMode::Api;
        })
        .await;
        let response = app
            .oneshot(post(&order_event().to_string(), Some(SECRET)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.feeds().await.is_empty());
    }

    #[tokio::test]
    async fn test_customer_event_upserts_partner() {
        let (store, app) = setup(None, |_| {}).await;
        let body = json!({
            "event": "customer.created",
            "data": {"id": 77, "first_name": "Omar", "last_name": "Saleh", "city": "Jeddah"}
        });
        let response = app.oneshot(post(&body.to_string(), Some(SECRET))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let partners = store.partners().await;
        assert_eq!(partners.len(), 1);
        assert_eq!(partners[0].store_id, "77");
        assert_eq!(partners[0].name, "Omar Saleh");
    }

    #[tokio::test]
    async fn test_other_events_are_acknowledged() {
        let (store, app) = setup(None, |_| {}).await;
        let body = json!({"event": "category.created", "data": {"id": 3}});
        let response = app.oneshot(post(&body.to_string(), Some(SECRET))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "success"}));
        assert!(store.partners().await.is_empty());
    }
}

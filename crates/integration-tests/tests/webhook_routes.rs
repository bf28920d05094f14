//! End-to-end webhook tests through the full router.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use channel_sync_connector::config::WebhookMode;
use channel_sync_connector::db::Store;
use channel_sync_core::{InvoiceState, NO_VARIANTS, OrderState};
use channel_sync_integration_tests::{
    CHANNEL, TestContext, channel, event, order_data, webhook_request,
};

#[tokio::test]
async fn test_health_and_readiness() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, _) = ctx
        .send(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unauthorized_calls_leave_no_trace() {
    let ctx = TestContext::new().await;
    let body = event("order.created", order_data("under_review"));

    for token in [None, Some("wrong-token"), Some("integration-secret")] {
        let (status, response) = ctx.send(webhook_request(&body, token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response, json!({"status": "unauthorized"}));
    }

    assert!(ctx.store.feeds().await.is_empty());
    assert!(ctx.store.partners().await.is_empty());
}

#[tokio::test]
async fn test_order_lifecycle_mirrors_status_back() {
    let ctx = TestContext::new().await;
    ctx.add_product("10", "Oud Oil", 100).await;

    // New order, status without a mapping: imported as a draft.
    let (status, body) = ctx
        .post_webhook(&event("order.created", order_data("under_review")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success"}));

    let orders = ctx.store.sale_orders().await;
    assert_eq!(orders.len(), 1);
    let order_id = orders[0].id;
    assert_eq!(orders[0].state, OrderState::Draft);
    assert_eq!(orders[0].lines.len(), 2);
    assert!(ctx.pusher.pushed().await.is_empty());

    // Paid: confirmed, invoiced, paid, payment registered, store told "completed".
    ctx.post_webhook(&event("order.updated", order_data("payment_received")))
        .await;
    let order = ctx.store.get_sale_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.state, OrderState::Sale);
    assert_eq!(order.invoice_state, InvoiceState::Paid);
    let payments = ctx.store.payments().await;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount, Decimal::new(14375, 2));
    assert_eq!(payments[0].journal, "mada");

    // Shipped: store told "delivered".
    ctx.post_webhook(&event("order.updated", order_data("delivering")))
        .await;
    let order = ctx.store.get_sale_order(order_id).await.unwrap().unwrap();
    assert!(order.shipped);

    // Cancelled by the store itself: no echo.
    ctx.post_webhook(&event("order.updated", order_data("canceled")))
        .await;
    let order = ctx.store.get_sale_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.state, OrderState::Cancel);

    assert_eq!(
        ctx.pusher.pushed().await,
        vec![
            ("2093117510".to_string(), "completed".to_string()),
            ("2093117510".to_string(), "delivered".to_string()),
        ]
    );

    // One order, one mapping, one feed, a log entry per delivery.
    assert_eq!(ctx.store.sale_orders().await.len(), 1);
    assert_eq!(ctx.store.order_mappings().await.len(), 1);
    assert_eq!(ctx.store.feeds().await.len(), 1);
    assert_eq!(ctx.store.sync_logs().await.len(), 4);
    assert_eq!(ctx.store.payments().await.len(), 1);
}

#[tokio::test]
async fn test_product_and_customer_events_feed_order_import() {
    let ctx = TestContext::new().await;

    let product = json!({
        "id": 10,
        "name": "Oud Oil",
        "sku": "OUD-10",
        "price": {"amount": 100, "currency": "SAR"}
    });
    let (status, _) = ctx.post_webhook(&event("product.created", product)).await;
    assert_eq!(status, StatusCode::OK);

    let customer = json!({
        "id": 1_227_534_533,
        "first_name": "Sara",
        "last_name": "Al Harbi",
        "mobile": 555_123_456,
        "mobile_code": "+966",
        "city": "Riyadh"
    });
    let (status, _) = ctx.post_webhook(&event("customer.created", customer)).await;
    assert_eq!(status, StatusCode::OK);

    let mapping = ctx
        .store
        .find_product_mapping(CHANNEL, "10", NO_VARIANTS)
        .await
        .unwrap()
        .unwrap();

    ctx.post_webhook(&event("order.created", order_data("under_review")))
        .await;

    let orders = ctx.store.sale_orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].lines[0].product_id, mapping.product_id);

    let partners = ctx.store.partners().await;
    assert_eq!(partners.len(), 1);
    assert_eq!(partners[0].store_id, "1227534533");
    assert_eq!(orders[0].partner_id, partners[0].id);
}

#[tokio::test]
async fn test_orders_before_start_date_are_rejected() {
    let mut gated = channel();
    gated.order_start_date = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    let ctx = TestContext::with(gated, |_| {}).await;
    ctx.add_product("10", "Oud Oil", 100).await;

    let (status, body) = ctx
        .post_webhook(&event("order.created", order_data("under_review")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "rejected"}));
    assert!(ctx.store.feeds().await.is_empty());
    assert!(ctx.store.sale_orders().await.is_empty());
}

#[tokio::test]
async fn test_disabled_modes_acknowledge_without_writing() {
    let ctx = TestContext::with(channel(), |config| {
        config.webhook_modes.order = WebhookMode::Disabled;
        config.webhook_modes.customer = WebhookMode::Disabled;
        config.webhook_modes.product = WebhookMode::Disabled;
    })
    .await;

    for body in [
        event("order.created", order_data("under_review")),
        event("customer.updated", json!({"id": 1, "first_name": "Omar"})),
        event("product.updated", json!({"id": 2, "name": "Tea"})),
    ] {
        let (status, response) = ctx.post_webhook(&body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, json!({"status": "success"}));
    }

    assert!(ctx.store.feeds().await.is_empty());
    assert!(ctx.store.partners().await.is_empty());
    assert!(ctx.store.products().await.is_empty());
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.post_webhook(&json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"status": "no data"}));

    let (status, _) = ctx.post_webhook(&json!({"data": {"id": 1}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post_webhook(&event("order.created", json!({"reference_id": 5})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(ctx.store.feeds().await.is_empty());
}

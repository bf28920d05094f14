//! Shared fixtures for the channel sync integration tests.
//!
//! Everything runs in process: the full router (tracing and Sentry layers
//! included) over a `MemoryStore`, with [`RecordingPusher`] standing in for
//! the Salla API and [`RecordingFulfillment`] for Omniful. No database or
//! network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p channel-sync-integration-tests
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;

use channel_sync_connector::config::ConnectorConfig;
use channel_sync_connector::db::{MemoryStore, Store};
use channel_sync_connector::models::{Channel, ChannelOrderState, NewProduct, Product, ProductMapping};
use channel_sync_connector::omniful::{
    FulfillmentPusher, OmnifulCustomer, OmnifulError, OmnifulOrder, OmnifulSku,
};
use channel_sync_connector::routes;
use channel_sync_connector::salla::{SallaError, StatusPusher};
use channel_sync_connector::services::{OmnifulStrategy, SallaStrategy, StrategyRegistry};
use channel_sync_connector::state::AppState;
use channel_sync_core::{ChannelId, ChannelKind, CurrencyCode, DefaultTaxType, NO_VARIANTS};

/// Bearer token accepted by the test router.
pub const WEBHOOK_SECRET: &str = "integration-secret-5f2c9a7e41";

/// The channel every fixture serves.
pub const CHANNEL: ChannelId = ChannelId::new(1);

/// Records status pushes instead of calling Salla.
#[derive(Default)]
pub struct RecordingPusher {
    pushed: Mutex<Vec<(String, String)>>,
}

impl RecordingPusher {
    /// `(store_order_id, slug)` pairs in push order.
    pub async fn pushed(&self) -> Vec<(String, String)> {
        self.pushed.lock().await.clone()
    }
}

#[async_trait]
impl StatusPusher for RecordingPusher {
    async fn push_status(&self, store_order_id: &str, slug: &str) -> Result<(), SallaError> {
        self.pushed
            .lock()
            .await
            .push((store_order_id.to_string(), slug.to_string()));
        Ok(())
    }
}

/// One recorded Omniful call.
#[derive(Debug, Clone, PartialEq)]
pub enum FulfillmentCall {
    Customer(OmnifulCustomer),
    Skus(Vec<OmnifulSku>),
    CreateOrder(OmnifulOrder),
    UpdateOrder(OmnifulOrder),
    CancelOrder(String),
}

/// Records Omniful pushes instead of calling the API.
#[derive(Default)]
pub struct RecordingFulfillment {
    calls: Mutex<Vec<FulfillmentCall>>,
}

impl RecordingFulfillment {
    /// Calls in push order.
    pub async fn calls(&self) -> Vec<FulfillmentCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl FulfillmentPusher for RecordingFulfillment {
    async fn create_customer(&self, customer: &OmnifulCustomer) -> Result<Option<String>, OmnifulError> {
        let mut calls = self.calls.lock().await;
        calls.push(FulfillmentCall::Customer(customer.clone()));
        Ok(Some(format!("cus_{}", calls.len())))
    }

    async fn create_skus(&self, skus: &[OmnifulSku]) -> Result<(), OmnifulError> {
        self.calls.lock().await.push(FulfillmentCall::Skus(skus.to_vec()));
        Ok(())
    }

    async fn create_order(&self, order: &OmnifulOrder) -> Result<Option<String>, OmnifulError> {
        self.calls
            .lock()
            .await
            .push(FulfillmentCall::CreateOrder(order.clone()));
        Ok(None)
    }

    async fn update_order(&self, order: &OmnifulOrder) -> Result<(), OmnifulError> {
        self.calls
            .lock()
            .await
            .push(FulfillmentCall::UpdateOrder(order.clone()));
        Ok(())
    }

    async fn cancel_order(&self, order_id: &str, _reason: &str) -> Result<(), OmnifulError> {
        self.calls
            .lock()
            .await
            .push(FulfillmentCall::CancelOrder(order_id.to_string()));
        Ok(())
    }
}

/// Hub every fixture forwards orders to.
pub const HUB_CODE: &str = "RYD-01";

/// A Salla channel with exclusive taxes and no start date.
#[must_use]
pub fn channel() -> Channel {
    Channel {
        id: CHANNEL,
        kind: ChannelKind::Salla,
        name: "Salla".to_string(),
        default_tax_type: DefaultTaxType::Exclude,
        tax_on_discount_line: false,
        use_store_order_name: false,
        order_start_date: None,
        delivery_product_id: None,
        discount_product_id: None,
        cod_product_id: None,
        company_currency: CurrencyCode::SAR,
    }
}

/// Status mapping used by the fixtures.
///
/// - `payment_received`: paid, with a payment registered
/// - `completed`: paid
/// - `delivering`: shipped
/// - `delivered`: shipped
/// - `canceled`: cancelled
fn order_states() -> Vec<ChannelOrderState> {
    let mut payment_received = ChannelOrderState::new(CHANNEL, "payment_received");
    payment_received.invoice_paid = true;
    payment_received.make_payment = true;

    let mut completed = ChannelOrderState::new(CHANNEL, "completed");
    completed.invoice_paid = true;

    let mut delivering = ChannelOrderState::new(CHANNEL, "delivering");
    delivering.ship = true;

    let mut delivered = ChannelOrderState::new(CHANNEL, "delivered");
    delivered.ship = true;

    let mut canceled = ChannelOrderState::new(CHANNEL, "canceled");
    canceled.cancel = true;

    vec![payment_received, completed, delivering, delivered, canceled]
}

/// Router, store and pushers wired together.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub pusher: Arc<RecordingPusher>,
    pub fulfillment: Arc<RecordingFulfillment>,
    pub state: AppState<MemoryStore>,
    app: Router,
}

impl TestContext {
    /// Default channel and configuration.
    pub async fn new() -> Self {
        Self::with(channel(), |_| {}).await
    }

    /// Custom channel and configuration.
    pub async fn with(channel: Channel, tweak: impl FnOnce(&mut ConnectorConfig)) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.insert_channel(channel).await;
        store.insert_currency(CurrencyCode::SAR, true).await;
        for state in order_states() {
            store.insert_order_state(state).await;
        }

        let pusher = Arc::new(RecordingPusher::default());
        let fulfillment = Arc::new(RecordingFulfillment::default());
        let strategies = StrategyRegistry::new()
            .with(
                ChannelKind::Salla,
                Arc::new(SallaStrategy::new(Some(
                    Arc::clone(&pusher) as Arc<dyn StatusPusher>
                ))),
            )
            .with(
                ChannelKind::Salla,
                Arc::new(OmnifulStrategy::new(
                    Arc::clone(&fulfillment) as Arc<dyn FulfillmentPusher>,
                    HUB_CODE,
                )),
            );

        let mut config = ConnectorConfig::with_defaults(
            SecretString::from("postgres://unused"),
            SecretString::from(WEBHOOK_SECRET),
        );
        tweak(&mut config);

        let state = AppState::with_parts(config, Arc::clone(&store), None, strategies);
        let app = routes::app(state.clone());
        Self {
            store,
            pusher,
            fulfillment,
            state,
            app,
        }
    }

    /// Send a request through the full router.
    ///
    /// Bodies that are not JSON come back as a JSON string.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    /// POST a webhook body with the right bearer token.
    pub async fn post_webhook(&self, body: &Value) -> (StatusCode, Value) {
        self.send(webhook_request(body, Some(WEBHOOK_SECRET))).await
    }

    /// Create a product and map it to a Salla product ID.
    pub async fn add_product(&self, store_product_id: &str, name: &str, price: i64) -> Product {
        let product = self
            .store
            .create_product(&NewProduct {
                name: name.to_string(),
                list_price: Decimal::from(price),
                ..NewProduct::default()
            })
            .await
            .expect("create product");
        self.store
            .upsert_product_mapping(&ProductMapping {
                channel_id: CHANNEL,
                store_product_id: store_product_id.to_string(),
                store_variant_id: NO_VARIANTS.to_string(),
                product_id: product.id,
                default_code: None,
                barcode: None,
            })
            .await
            .expect("map product");
        product
    }
}

/// A webhook request, optionally carrying `Authorization: Bearer <token>`.
#[must_use]
pub fn webhook_request(body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/salla/webhook")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// Wrap `data` in a webhook envelope.
#[must_use]
pub fn event(name: &str, data: Value) -> Value {
    json!({
        "event": name,
        "merchant": 1_305_146_709,
        "created_at": "2024-03-02 14:05:11",
        "data": data
    })
}

/// Salla order `2093117510` (reference `64543212`) for one 100 SAR item of
/// product `10` at 15% VAT, 25 SAR shipping, total 143.75.
#[must_use]
pub fn order_data(status_slug: &str) -> Value {
    json!({
        "id": 2_093_117_510_i64,
        "reference_id": 64_543_212,
        "currency": "SAR",
        "date": {"date": "2024-03-02 14:05:11.000000", "timezone": "Asia/Riyadh"},
        "status": {"slug": status_slug, "name": status_slug},
        "payment_method": "mada",
        "customer": {
            "id": 1_227_534_533,
            "first_name": "Sara",
            "last_name": "Al Harbi",
            "email": "sara@example.sa",
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
    })
}

//! Omniful REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use url::Url;

use super::OmnifulError;
use super::payload::{OmnifulCustomer, OmnifulOrder, OmnifulSku};
use crate::config::OmnifulConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Omniful sales channel API client.
///
/// Cheap to clone; clones share the HTTP pool.
#[derive(Clone)]
pub struct OmnifulClient {
    inner: Arc<OmnifulClientInner>,
}

struct OmnifulClientInner {
    client: reqwest::Client,
    api_base: Url,
    access_token: SecretString,
}

/// Omniful answers `{"is_success": .., "data": {"id": ..}}`.
#[derive(Debug, Deserialize)]
struct DataResponse {
    #[serde(default)]
    data: Option<RemoteRecord>,
}

#[derive(Debug, Deserialize)]
struct RemoteRecord {
    #[serde(default, deserialize_with = "crate::payload::lenient::opt_string")]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Forwards imported records to the fulfillment platform.
///
/// Implemented by [`OmnifulClient`]; the fulfillment strategy depends on this
/// trait so it can run without network access.
#[async_trait]
pub trait FulfillmentPusher: Send + Sync {
    /// Create a customer, returning the remote ID when one is reported.
    async fn create_customer(&self, customer: &OmnifulCustomer) -> Result<Option<String>, OmnifulError>;

    /// Create SKUs in one batch.
    async fn create_skus(&self, skus: &[OmnifulSku]) -> Result<(), OmnifulError>;

    /// Create an order, returning the remote ID when one is reported.
    async fn create_order(&self, order: &OmnifulOrder) -> Result<Option<String>, OmnifulError>;

    /// Replace an existing order.
    async fn update_order(&self, order: &OmnifulOrder) -> Result<(), OmnifulError>;

    /// Cancel the order named `order_id`.
    async fn cancel_order(&self, order_id: &str, reason: &str) -> Result<(), OmnifulError>;
}

impl OmnifulClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `OmnifulError::Http` if the HTTP client cannot be built.
    pub fn new(config: &OmnifulConfig) -> Result<Self, OmnifulError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(OmnifulClientInner {
                client,
                api_base: config.api_base.clone(),
                access_token: config.access_token.clone(),
            }),
        })
    }

    async fn send<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, OmnifulError> {
        let url = endpoint(&self.inner.api_base, path)?;
        let response = self
            .inner
            .client
            .request(method, url)
            .bearer_auth(self.inner.access_token.expose_secret())
            .json(body)
            .send()
            .await?;

        check_status(response, path).await
    }

    /// Send and read the created record's ID.
    async fn create<B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<String>, OmnifulError> {
        let response = self.send(Method::POST, path, body).await?;
        remote_id(&response.bytes().await?)
    }
}

#[async_trait]
impl FulfillmentPusher for OmnifulClient {
    #[instrument(skip_all)]
    async fn create_customer(&self, customer: &OmnifulCustomer) -> Result<Option<String>, OmnifulError> {
        let id = self.create("customers", customer).await?;
        tracing::info!(remote_id = ?id, "Created Omniful customer");
        Ok(id)
    }

    #[instrument(skip_all, fields(count = skus.len()))]
    async fn create_skus(&self, skus: &[OmnifulSku]) -> Result<(), OmnifulError> {
        self.send(Method::POST, "master/skus", skus).await?;
        tracing::info!("Created Omniful SKUs");
        Ok(())
    }

    #[instrument(skip_all, fields(order_id = %order.order_id))]
    async fn create_order(&self, order: &OmnifulOrder) -> Result<Option<String>, OmnifulError> {
        let id = self.create("orders", order).await?;
        tracing::info!(remote_id = ?id, "Sent order to Omniful");
        Ok(id)
    }

    #[instrument(skip_all, fields(order_id = %order.order_id))]
    async fn update_order(&self, order: &OmnifulOrder) -> Result<(), OmnifulError> {
        self.send(Method::PUT, "orders", order).await?;
        tracing::info!("Updated Omniful order");
        Ok(())
    }

    #[instrument(skip(self, reason))]
    async fn cancel_order(&self, order_id: &str, reason: &str) -> Result<(), OmnifulError> {
        let body = json!({ "cancel_reason": reason });
        self.send(Method::PUT, &format!("orders/{order_id}/cancel"), &body)
            .await?;
        tracing::info!("Cancelled Omniful order");
        Ok(())
    }
}

/// Resolve `path` against the API base, which always ends in `/`.
fn endpoint(base: &Url, path: &str) -> Result<Url, OmnifulError> {
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// The `data.id` of a success body. Empty bodies carry no ID.
fn remote_id(body: &[u8]) -> Result<Option<String>, OmnifulError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: DataResponse = serde_json::from_slice(body)?;
    Ok(parsed.data.and_then(|record| record.id))
}

async fn check_status(response: reqwest::Response, path: &str) -> Result<reqwest::Response, OmnifulError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(OmnifulError::Unauthorized),
        StatusCode::NOT_FOUND => Err(OmnifulError::NotFound(path.to_string())),
        _ => {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
            Err(OmnifulError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

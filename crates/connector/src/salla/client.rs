//! Salla REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

use super::SallaError;
use super::auth::{SallaToken, refresh_access_token};
use crate::config::SallaConfig;
use crate::payload::{SallaCustomer, SallaItem, SallaOrder, SallaProduct, SallaStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Salla merchant API client.
///
/// Cheap to clone; clones share the HTTP pool and token.
#[derive(Clone)]
pub struct SallaClient {
    inner: Arc<SallaClientInner>,
}

struct SallaClientInner {
    client: reqwest::Client,
    api_base: Url,
    client_id: String,
    client_secret: SecretString,
    token: RwLock<SallaToken>,
}

/// Salla wraps every payload in `{"status": .., "success": .., "data": ..}`.
#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Pushes an order status back to the store.
///
/// Implemented by [`SallaClient`]; channel strategies depend on this trait so
/// they can run without network access.
#[async_trait]
pub trait StatusPusher: Send + Sync {
    /// Set the store order's status to `slug`.
    async fn push_status(&self, store_order_id: &str, slug: &str) -> Result<(), SallaError>;
}

impl SallaClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `SallaError::Http` if the HTTP client cannot be built.
    pub fn new(config: &SallaConfig) -> Result<Self, SallaError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SallaClientInner {
                client,
                api_base: config.api_base.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                token: RwLock::new(SallaToken {
                    access_token: config.access_token.clone(),
                    refresh_token: config.refresh_token.clone(),
                    expires_at: None,
                }),
            }),
        })
    }

    /// Current token pair, e.g. to persist after a refresh.
    pub async fn token(&self) -> SallaToken {
        self.inner.token.read().await.clone()
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Fetch an order by Salla ID.
    ///
    /// # Errors
    ///
    /// Returns `SallaError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn get_order(&self, id: &str) -> Result<SallaOrder, SallaError> {
        self.get_data(&format!("orders/{id}")).await
    }

    /// Fetch the items of an order.
    ///
    /// # Errors
    ///
    /// Returns `SallaError` on HTTP or parse failures.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn get_order_items(&self, id: &str) -> Result<Vec<SallaItem>, SallaError> {
        self.get_data(&format!("orders/items?order_id={id}")).await
    }

    /// Fetch an order, filling in its items from `orders/items` when the order
    /// body comes without them.
    ///
    /// # Errors
    ///
    /// Returns `SallaError` if either request fails.
    pub async fn get_order_with_items(&self, id: &str) -> Result<SallaOrder, SallaError> {
        let mut order = self.get_order(id).await?;
        if order.items.is_empty() {
            order.items = self.get_order_items(id).await?;
        }
        Ok(order)
    }

    /// List the store's order statuses.
    ///
    /// # Errors
    ///
    /// Returns `SallaError` on HTTP or parse failures.
    #[instrument(skip(self))]
    pub async fn list_order_statuses(&self) -> Result<Vec<SallaStatus>, SallaError> {
        self.get_data("orders/statuses").await
    }

    /// Set an order's status by slug.
    ///
    /// # Errors
    ///
    /// Returns `SallaError` if Salla rejects the update.
    #[instrument(skip(self), fields(store_id = %id, slug = %slug))]
    pub async fn update_order_status(&self, id: &str, slug: &str) -> Result<(), SallaError> {
        let body = json!({ "slug": slug });
        self.send(Method::POST, &format!("orders/{id}/status"), Some(&body))
            .await?;
        tracing::info!("Pushed order status to Salla");
        Ok(())
    }

    // =========================================================================
    // Customers & products
    // =========================================================================

    /// Fetch a customer by Salla ID.
    ///
    /// # Errors
    ///
    /// Returns `SallaError::NotFound` if the customer does not exist.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn get_customer(&self, id: &str) -> Result<SallaCustomer, SallaError> {
        self.get_data(&format!("customers/{id}")).await
    }

    /// Fetch a product by Salla ID.
    ///
    /// # Errors
    ///
    /// Returns `SallaError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(store_id = %id))]
    pub async fn get_product(&self, id: &str) -> Result<SallaProduct, SallaError> {
        self.get_data(&format!("products/{id}")).await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, SallaError> {
        let response = self.send(Method::GET, path, None).await?;
        let body = response.bytes().await?;
        let wrapped: DataResponse<T> = serde_json::from_slice(&body)?;
        Ok(wrapped.data)
    }

    /// Send a request, refreshing the token and retrying once on 401.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, SallaError> {
        let url = endpoint(&self.inner.api_base, path)?;

        let response = self.attempt(method.clone(), url.clone(), body).await?;
        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "Salla rejected access token, refreshing");
            self.refresh().await?;
            self.attempt(method, url, body).await?
        } else {
            response
        };

        check_status(response, path).await
    }

    async fn attempt(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, SallaError> {
        let access_token = self
            .inner
            .token
            .read()
            .await
            .access_token
            .as_ref()
            .map(|t| t.expose_secret().to_string());

        let mut request = self.inner.client.request(method, url);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn refresh(&self) -> Result<(), SallaError> {
        let mut token = self.inner.token.write().await;
        if !token.can_refresh() {
            return Err(SallaError::NoAccessToken);
        }
        let refreshed = refresh_access_token(
            &self.inner.client,
            &self.inner.client_id,
            &self.inner.client_secret,
            &token,
        )
        .await?;
        *token = refreshed;
        Ok(())
    }
}

#[async_trait]
impl StatusPusher for SallaClient {
    async fn push_status(&self, store_order_id: &str, slug: &str) -> Result<(), SallaError> {
        self.update_order_status(store_order_id, slug).await
    }
}

/// Resolve `path` against the API base, which always ends in `/`.
fn endpoint(base: &Url, path: &str) -> Result<Url, SallaError> {
    Ok(base.join(path.trim_start_matches('/'))?)
}

async fn check_status(response: reqwest::Response, path: &str) -> Result<reqwest::Response, SallaError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(SallaError::RateLimited(retry_after))
        }
        StatusCode::NOT_FOUND => Err(SallaError::NotFound(path.to_string())),
        StatusCode::UNAUTHORIZED => Err(SallaError::AuthenticationFailed(
            "access token rejected after refresh".to_string(),
        )),
        _ => {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
            Err(SallaError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://api.salla.dev/admin/v2/").unwrap()
    }

    #[test]
    fn test_endpoint_keeps_version_prefix() {
        assert_eq!(
            endpoint(&base(), "orders/42").unwrap().as_str(),
            "https://api.salla.dev/admin/v2/orders/42"
        );
        assert_eq!(
            endpoint(&base(), "/orders/items?order_id=42").unwrap().as_str(),
            "https://api.salla.dev/admin/v2/orders/items?order_id=42"
        );
    }

    #[test]
    fn test_data_response_unwraps() {
        let body = r#"{"status":200,"success":true,"data":[{"id":1,"name":"New","slug":"new"}]}"#;
        let parsed: DataResponse<Vec<SallaStatus>> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].slug.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_client_starts_with_configured_tokens() {
        let config = SallaConfig {
            client_id: "client".to_string(),
            client_secret: SecretString::from("s3cr3t"),
            access_token: Some(SecretString::from("access")),
            refresh_token: None,
            api_base: base(),
        };
        let client = SallaClient::new(&config).unwrap();
        let token = client.token().await;
        assert!(token.access_token.is_some());
        assert!(!token.can_refresh());
    }
}

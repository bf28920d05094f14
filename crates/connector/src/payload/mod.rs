//! Salla webhook payloads.
//!
//! Salla wraps every webhook in the same envelope:
//!
//! ```json
//! {"event": "order.created", "merchant": 123, "created_at": "...", "data": {...}}
//! ```
//!
//! The envelope is parsed first; `data` is kept as raw JSON and decoded into
//! the typed record for the event ([`SallaOrder`], [`SallaCustomer`],
//! [`SallaProduct`]) once the event kind is known. Every amount and ID field is
//! read leniently because Salla mixes numbers, numeric strings and `null`
//! across endpoints.

pub mod catalog;
pub(crate) mod lenient;
pub mod order;

pub use catalog::{SallaCustomer, SallaProduct, SallaSku, SallaStatus};
pub use order::{
    Amount, DiscountEntry, ItemAmounts, OrderAmounts, SallaItem, SallaOrder, TaxAmount,
};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors from reading a webhook payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The request body was empty.
    #[error("no data")]
    Empty,

    /// The body is not JSON.
    #[error("payload is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    /// The body is JSON but not an object with an `event` key.
    #[error("payload has no event")]
    MissingEvent,

    /// `data` does not match the record expected for the event.
    #[error("invalid {record} data: {source}")]
    InvalidData {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A field required to identify the record is missing.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The order date matches none of the accepted formats.
    #[error("unparseable order date: {0}")]
    InvalidDate(String),

    /// The currency is not a 3-letter code.
    #[error("invalid currency: {0}")]
    InvalidCurrency(String),
}

/// Kind of record a webhook event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Order,
    Customer,
    Product,
    /// Acknowledged and ignored (categories, carts, app events).
    Other,
}

impl EventKind {
    /// Classify an event name by substring, e.g. `order.updated` → `Order`.
    #[must_use]
    pub fn from_event(event: &str) -> Self {
        let event = event.to_ascii_lowercase();
        if event.contains("order") {
            Self::Order
        } else if event.contains("customer") {
            Self::Customer
        } else if event.contains("product") {
            Self::Product
        } else {
            Self::Other
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Customer => "customer",
            Self::Product => "product",
            Self::Other => "other",
        }
    }
}

/// The webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub merchant: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl WebhookEnvelope {
    /// Parse a raw request body.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Empty` for a blank body, `NotJson` for invalid
    /// JSON and `MissingEvent` when the body is not an object with an `event`.
    pub fn parse(body: &[u8]) -> Result<Self, PayloadError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(PayloadError::Empty);
        }
        let value: Value = serde_json::from_slice(body).map_err(PayloadError::NotJson)?;
        match &value {
            Value::Object(map) if map.get("event").is_some_and(Value::is_string) => {}
            Value::Object(map) if map.is_empty() => return Err(PayloadError::Empty),
            _ => return Err(PayloadError::MissingEvent),
        }
        serde_json::from_value(value).map_err(|_| PayloadError::MissingEvent)
    }

    /// Kind of record this event concerns.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        EventKind::from_event(&self.event)
    }

    /// Decode `data` as an order.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::InvalidData` if `data` is not an order object.
    pub fn order(&self) -> Result<SallaOrder, PayloadError> {
        decode(&self.data, "order")
    }

    /// Decode `data` as a customer.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::InvalidData` if `data` is not a customer object.
    pub fn customer(&self) -> Result<SallaCustomer, PayloadError> {
        decode(&self.data, "customer")
    }

    /// Decode `data` as a product.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::InvalidData` if `data` is not a product object.
    pub fn product(&self) -> Result<SallaProduct, PayloadError> {
        decode(&self.data, "product")
    }

    /// Platform ID of the record in `data`, if any.
    #[must_use]
    pub fn data_id(&self) -> Option<String> {
        lenient::value_to_string(self.data.get("id")?)
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    data: &Value,
    record: &'static str,
) -> Result<T, PayloadError> {
    T::deserialize(data).map_err(|source| PayloadError::InvalidData { record, source })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_dispatch() {
        assert_eq!(EventKind::from_event("order.created"), EventKind::Order);
        assert_eq!(EventKind::from_event("order.status.updated"), EventKind::Order);
        assert_eq!(EventKind::from_event("customer.updated"), EventKind::Customer);
        assert_eq!(EventKind::from_event("product.created"), EventKind::Product);
        assert_eq!(EventKind::from_event("category.created"), EventKind::Other);
    }

    #[test]
    fn test_parse_envelope() {
        let body = br#"{"event":"order.created","merchant":1305146709,"created_at":"2024-03-01 10:00:00","data":{"id":77}}"#;
        let envelope = WebhookEnvelope::parse(body).unwrap();
        assert_eq!(envelope.kind(), EventKind::Order);
        assert_eq!(envelope.merchant.as_deref(), Some("1305146709"));
        assert_eq!(envelope.data_id().as_deref(), Some("77"));
    }

    #[test]
    fn test_parse_rejects_bad_bodies() {
        assert!(matches!(WebhookEnvelope::parse(b""), Err(PayloadError::Empty)));
        assert!(matches!(WebhookEnvelope::parse(b"  \n"), Err(PayloadError::Empty)));
        assert!(matches!(WebhookEnvelope::parse(b"{}"), Err(PayloadError::Empty)));
        assert!(matches!(
            WebhookEnvelope::parse(b"not json"),
            Err(PayloadError::NotJson(_))
        ));
        assert!(matches!(
            WebhookEnvelope::parse(b"[1,2]"),
            Err(PayloadError::MissingEvent)
        ));
        assert!(matches!(
            WebhookEnvelope::parse(br#"{"data":{}}"#),
            Err(PayloadError::MissingEvent)
        ));
    }

    #[test]
    fn test_order_data_must_be_object() {
        let envelope = WebhookEnvelope::parse(br#"{"event":"order.created","data":"x"}"#).unwrap();
        assert!(matches!(
            envelope.order(),
            Err(PayloadError::InvalidData { record: "order", .. })
        ));
    }
}

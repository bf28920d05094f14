//! Omniful sales channel API client.
//!
//! Imported orders are forwarded to Omniful for fulfillment, together with the
//! customer and the SKUs they reference.
//!
//! # Architecture
//!
//! - Static bearer token from configuration, no refresh
//! - One payload builder per record kind in [`payload`]
//! - [`FulfillmentPusher`] is the seam channel strategies depend on

pub mod client;
pub mod payload;

pub use client::{FulfillmentPusher, OmnifulClient};
pub use payload::{
    OmnifulAddress, OmnifulCustomer, OmnifulInvoice, OmnifulOrder, OmnifulOrderCustomer,
    OmnifulOrderItem, OmnifulSku,
};

use thiserror::Error;

/// Errors that can occur when talking to Omniful.
#[derive(Debug, Error)]
pub enum OmnifulError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The access token was rejected.
    #[error("Omniful rejected the access token")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("Omniful API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// An order amount does not fit in a decimal.
    #[error("amount overflow in order {0}")]
    AmountOverflow(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omniful_error_display() {
        assert_eq!(
            OmnifulError::Api {
                status: 422,
                message: "hub_code is invalid".to_string()
            }
            .to_string(),
            "Omniful API error (HTTP 422): hub_code is invalid"
        );
        assert_eq!(
            OmnifulError::AmountOverflow("1001".to_string()).to_string(),
            "amount overflow in order 1001"
        );
    }
}

//! The normalized order feed.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line::CanonicalLine;
use super::money::CurrencyCode;

/// Customer as described by the order payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CustomerInfo {
    /// Platform customer ID. Orders without one cannot be imported.
    pub store_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    /// Country dialing code (without `+`) followed by the mobile number.
    pub invoice_phone: String,
}

/// Shipping/invoice address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AddressInfo {
    pub street: String,
    pub street2: String,
    pub zip: String,
    pub city: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
}

/// A platform order after normalization, ready to be staged and imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFeed {
    /// Platform order ID.
    pub store_id: String,
    /// Human order reference (becomes the internal order name).
    pub name: String,
    /// Where the feed came from (`webhook`, `api`, `file`).
    pub store_source: String,
    pub currency: CurrencyCode,
    /// Order date in store time, when the payload carried one.
    pub date_order: Option<DateTime<FixedOffset>>,
    /// Platform status slug, e.g. `completed`.
    pub status_slug: String,
    pub payment_method: String,
    /// Carrier name, when the order ships with one.
    pub carrier: Option<String>,
    pub customer: CustomerInfo,
    pub address: AddressInfo,
    pub lines: Vec<CanonicalLine>,
    pub total_amount: Decimal,
}

impl OrderFeed {
    /// Lines that are purchased items.
    pub fn product_lines(&self) -> impl Iterator<Item = &CanonicalLine> {
        self.lines.iter().filter(|line| line.is_product())
    }
}

//! Canonical order lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::LineSource;
use super::tax::TaxDescriptor;

/// Variant descriptor for items sold without variants.
pub const NO_VARIANTS: &str = "No Variants";

/// One order line in platform-neutral form.
///
/// Prices are always stored positive; a `Discount` line is negated only when it
/// is mapped onto an internal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalLine {
    pub name: String,
    /// Platform product ID, absent for synthetic lines.
    pub product_ref: Option<String>,
    /// Platform variant ID or [`NO_VARIANTS`].
    pub variant: String,
    /// Merchant SKU, empty when unknown.
    pub sku: String,
    pub barcode: Option<String>,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub taxes: Vec<TaxDescriptor>,
    /// Discount in percent of the unit price.
    pub discount_percent: Decimal,
    pub source: LineSource,
}

impl CanonicalLine {
    /// A single-quantity, untaxed line with no product reference.
    #[must_use]
    pub fn synthetic(name: impl Into<String>, unit_price: Decimal, source: LineSource) -> Self {
        Self {
            name: name.into(),
            product_ref: None,
            variant: NO_VARIANTS.to_owned(),
            sku: String::new(),
            barcode: None,
            unit_price,
            quantity: Decimal::ONE,
            taxes: Vec::new(),
            discount_percent: Decimal::ZERO,
            source,
        }
    }

    /// Whether this line is a purchased item.
    #[must_use]
    pub const fn is_product(&self) -> bool {
        matches!(self.source, LineSource::Product)
    }
}

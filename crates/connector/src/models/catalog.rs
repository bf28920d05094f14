//! Partners, products, carriers, currencies and taxes referenced by orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use channel_sync_core::{
    CarrierId, ChannelId, CurrencyCode, CurrencyId, PartnerId, PricelistId, ProductId,
    TaxAmountType, TaxId,
};

/// A customer known to the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub channel_id: ChannelId,
    /// Platform customer ID.
    pub store_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub street: String,
    pub street2: String,
    pub zip: String,
    pub city: String,
    pub country_code: String,
}

/// Fields for creating or refreshing a partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPartner {
    pub channel_id: ChannelId,
    pub store_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub street: String,
    pub street2: String,
    pub zip: String,
    pub city: String,
    pub country_code: String,
}

/// A sellable product or service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Merchant SKU.
    pub default_code: Option<String>,
    pub barcode: Option<String>,
    pub list_price: Decimal,
    /// Service products (shipping, discount, fees) are not stocked.
    pub is_service: bool,
    /// Taxes applied when an order line brings none of its own.
    pub tax_ids: Vec<TaxId>,
}

/// Fields for creating or refreshing a product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewProduct {
    pub name: String,
    pub default_code: Option<String>,
    pub barcode: Option<String>,
    pub list_price: Decimal,
    pub is_service: bool,
    pub tax_ids: Vec<TaxId>,
}

impl NewProduct {
    /// An untaxed service product.
    #[must_use]
    pub fn service(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_service: true,
            ..Self::default()
        }
    }
}

/// Link between a store product/variant and an internal product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMapping {
    pub channel_id: ChannelId,
    pub store_product_id: String,
    pub store_variant_id: String,
    pub product_id: ProductId,
    pub default_code: Option<String>,
    pub barcode: Option<String>,
}

/// A shipping carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    pub id: CarrierId,
    pub name: String,
    /// Product used for the carrier's shipping lines.
    pub product_id: Option<ProductId>,
}

/// A currency and whether it is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub code: CurrencyCode,
    pub active: bool,
}

/// A pricelist in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricelist {
    pub id: PricelistId,
    pub name: String,
    pub currency_id: CurrencyId,
}

/// An internal tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tax {
    pub id: TaxId,
    pub name: String,
    pub amount: Decimal,
    pub amount_type: TaxAmountType,
    pub price_include: bool,
}

/// Criteria for finding an existing tax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxQuery {
    pub amount: Decimal,
    pub amount_type: TaxAmountType,
    pub price_include: bool,
    /// Only match taxes with this exact name.
    pub name: Option<String>,
}

impl TaxQuery {
    /// Whether `tax` satisfies this query.
    #[must_use]
    pub fn matches(&self, tax: &Tax) -> bool {
        tax.amount == self.amount
            && tax.amount_type == self.amount_type
            && tax.price_include == self.price_include
            && self.name.as_ref().is_none_or(|name| &tax.name == name)
    }
}

/// Fields for a new tax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTax {
    pub name: String,
    pub amount: Decimal,
    pub amount_type: TaxAmountType,
    pub price_include: bool,
}

/// Natural key of a channel tax mapping.
///
/// Inclusivity is always part of the key, so a 15% inclusive and a 15%
/// exclusive tax never share a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxKey {
    pub channel_id: ChannelId,
    /// Rate, normalized (no trailing zeros).
    pub rate: Decimal,
    pub amount_type: TaxAmountType,
    pub inclusive: bool,
}

impl TaxKey {
    /// Build a key, normalizing the rate so `15` and `15.00` collide.
    #[must_use]
    pub fn new(channel_id: ChannelId, rate: Decimal, amount_type: TaxAmountType, inclusive: bool) -> Self {
        Self {
            channel_id,
            rate: rate.normalize(),
            amount_type,
            inclusive,
        }
    }
}

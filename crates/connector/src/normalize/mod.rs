//! Salla order → [`OrderFeed`] normalization.
//!
//! Pure functions: no I/O, no store access. Everything that varies between
//! deployments (labels, defaults, store timezone) comes from
//! [`NormalizerConfig`].

pub mod aggregate;
pub mod date;
pub mod lines;

pub use aggregate::append_aggregate_lines;
pub use date::parse_order_date;
pub use lines::normalize_item;

use chrono::{FixedOffset, Offset, Utc};

use channel_sync_core::{AddressInfo, CurrencyCode, CustomerInfo, OrderFeed};

use crate::payload::{Amount, PayloadError, SallaOrder};

/// Asia/Riyadh has no DST.
const STORE_OFFSET_SECS: i32 = 3 * 3600;

const NOT_AVAILABLE: &str = "N/A";

/// Defaults and labels used while normalizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub default_currency: CurrencyCode,
    pub default_country: String,
    /// Carry per-item discounts as line discount percentages.
    pub apply_item_discounts: bool,
    pub unknown_product: String,
    pub unknown_customer: String,
    pub default_status: String,
    pub default_payment_method: String,
    pub shipping_label: String,
    pub cod_label: String,
    /// Prefix of discount line names (`<label>: <title>`).
    pub discount_label: String,
    pub empty_order_label: String,
    /// Offset applied to order dates that carry none.
    pub store_offset: FixedOffset,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            default_currency: CurrencyCode::SAR,
            default_country: "SA".to_string(),
            apply_item_discounts: true,
            unknown_product: "Unknown Product".to_string(),
            unknown_customer: "Unknown Customer".to_string(),
            default_status: "pending".to_string(),
            default_payment_method: "unknown".to_string(),
            shipping_label: "Shipping".to_string(),
            cod_label: "Cash on Delivery".to_string(),
            discount_label: "Discount".to_string(),
            empty_order_label: "Empty Order".to_string(),
            store_offset: FixedOffset::east_opt(STORE_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Normalize a Salla order.
///
/// `created_at` is the webhook envelope timestamp, used when the order itself
/// carries no date. `store_source` records where the order came from
/// (`webhook`, `api`, `file`).
///
/// # Errors
///
/// Returns a `PayloadError` when the order has no ID, an unparseable date or a
/// malformed currency code.
pub fn normalize_order(
    order: &SallaOrder,
    created_at: Option<&str>,
    store_source: &str,
    config: &NormalizerConfig,
) -> Result<OrderFeed, PayloadError> {
    let store_id = order.id.clone().ok_or(PayloadError::MissingField("id"))?;

    let currency = match order.currency.as_deref() {
        Some(code) => {
            CurrencyCode::parse(code).map_err(|_| PayloadError::InvalidCurrency(code.to_owned()))?
        }
        None => config.default_currency,
    };

    let date_order = order
        .date
        .as_ref()
        .and_then(|d| d.date.as_deref())
        .or(created_at)
        .map(|raw| parse_order_date(raw, config.store_offset))
        .transpose()?;

    let mut lines: Vec<_> = order
        .items
        .iter()
        .map(|item| normalize_item(item, config))
        .collect();
    append_aggregate_lines(&mut lines, order.amounts.as_ref(), config);

    let total_amount = order
        .amounts
        .as_ref()
        .and_then(|a| a.total.as_ref())
        .map(Amount::value)
        .unwrap_or_default();

    Ok(OrderFeed {
        name: order.reference_id.clone().unwrap_or_else(|| store_id.clone()),
        store_id,
        store_source: store_source.to_owned(),
        currency,
        date_order,
        status_slug: order
            .status
            .as_ref()
            .and_then(|s| s.slug.clone())
            .unwrap_or_else(|| config.default_status.clone()),
        payment_method: order
            .payment_method
            .clone()
            .unwrap_or_else(|| config.default_payment_method.clone()),
        carrier: order.carrier_name().map(str::to_owned),
        customer: customer_info(order, config),
        address: address_info(order, config),
        lines,
        total_amount,
    })
}

fn customer_info(order: &SallaOrder, config: &NormalizerConfig) -> CustomerInfo {
    let Some(customer) = order.customer.as_ref() else {
        return CustomerInfo {
            name: config.unknown_customer.clone(),
            invoice_phone: NOT_AVAILABLE.to_owned(),
            ..CustomerInfo::default()
        };
    };

    CustomerInfo {
        store_id: customer.id.clone(),
        name: customer
            .display_name()
            .unwrap_or_else(|| config.unknown_customer.clone()),
        email: customer.email.clone(),
        mobile: customer.mobile.clone(),
        invoice_phone: customer
            .invoice_phone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
    }
}

fn address_info(order: &SallaOrder, config: &NormalizerConfig) -> AddressInfo {
    let address = order
        .shipping
        .as_ref()
        .and_then(|s| s.address.clone())
        .unwrap_or_default();
    let or_na = |value: Option<String>| value.unwrap_or_else(|| NOT_AVAILABLE.to_owned());

    AddressInfo {
        street: or_na(address.street_number),
        street2: or_na(address.shipping_address),
        zip: address.postal_code.unwrap_or_default(),
        city: or_na(address.city),
        country_code: address
            .country_code
            .unwrap_or_else(|| config.default_country.clone()),
    }
}

//! Request bodies for the Omniful sales channel API.
//!
//! Amounts go over the wire as JSON numbers. Every sum is checked; an order
//! whose amounts overflow is refused rather than sent with a wrapped total.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use channel_sync_core::{InvoiceState, LineSource, OrderFeed, ProductId};

use super::OmnifulError;
use crate::models::{Partner, Product, SaleOrder, SaleOrderLine};

/// Calling code sent with every customer mobile.
pub const CALLING_CODE: &str = "+966";

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Order create/update body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmnifulOrder {
    /// Only sent on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_type: Option<&'static str>,
    pub order_id: String,
    pub order_alias: String,
    pub hub_code: String,
    pub order_items: Vec<OmnifulOrderItem>,
    pub billing_address: OmnifulAddress,
    pub shipping_address: OmnifulAddress,
    pub invoice: OmnifulInvoice,
    pub customer: OmnifulOrderCustomer,
    pub payment_method: &'static str,
    pub require_shipping: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmnifulOrderItem {
    pub sku_code: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub display_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub selling_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: i64,
    /// Percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    pub is_substituted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmnifulAddress {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub zip: String,
    pub country_code: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmnifulInvoice {
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_due: Decimal,
    pub payment_method: String,
}

/// Customer block embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmnifulOrderCustomer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    pub mobile_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Customer create body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmnifulCustomer {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub mobile: String,
    pub country_calling_code: &'static str,
    pub country_code: String,
    pub address: OmnifulAddress,
}

/// One entry of the SKU create body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmnifulSku {
    pub name: String,
    pub sku_code: String,
    pub barcodes: Vec<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: &'static str,
    pub uom: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub retail_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub selling_price: Decimal,
    pub is_perishable: bool,
}

/// SKU code an order item refers to.
#[must_use]
pub fn sku_code(product_id: ProductId, product: Option<&Product>) -> String {
    product
        .and_then(|p| p.default_code.clone())
        .unwrap_or_else(|| format!("sku-{product_id}"))
}

/// Build the order body.
///
/// Items are the order's product lines. Shipping and discount come from the
/// matching service lines; the total is the one the store reported.
///
/// # Errors
///
/// Returns `OmnifulError::AmountOverflow` if a line or invoice amount overflows.
pub fn order_payload(
    order: &SaleOrder,
    feed: &OrderFeed,
    customer_id: &str,
    products: &HashMap<ProductId, Product>,
    hub_code: &str,
    create: bool,
) -> Result<OmnifulOrder, OmnifulError> {
    let overflow = || OmnifulError::AmountOverflow(order.name.clone());

    let mut order_items = Vec::new();
    let mut subtotal = Decimal::ZERO;
    let mut shipping_price = Decimal::ZERO;
    let mut discount = Decimal::ZERO;
    for line in &order.lines {
        let amount = line_subtotal(line).ok_or_else(overflow)?;
        match line.source {
            LineSource::Product => {
                subtotal = subtotal.checked_add(amount).ok_or_else(overflow)?;
                order_items.push(order_item(line, products.get(&line.product_id), amount));
            }
            LineSource::Delivery => {
                shipping_price = shipping_price.checked_add(amount).ok_or_else(overflow)?;
            }
            LineSource::Discount => {
                discount = discount.checked_add(amount.abs()).ok_or_else(overflow)?;
            }
            LineSource::CashOnDelivery | LineSource::Placeholder => {}
        }
    }

    let paid = order.invoice_state == InvoiceState::Paid;
    let (total_paid, total_due) = if paid {
        (order.total_amount, Decimal::ZERO)
    } else {
        (Decimal::ZERO, order.total_amount)
    };

    let (first_name, last_name) = split_name(&feed.customer.name);
    let address = OmnifulAddress {
        first_name: first_name.clone(),
        last_name: last_name.clone(),
        address1: feed.address.street.clone(),
        address2: feed.address.street2.clone(),
        city: feed.address.city.clone(),
        zip: feed.address.zip.clone(),
        country_code: feed.address.country_code.clone(),
        phone: feed.customer.invoice_phone.clone(),
    };

    Ok(OmnifulOrder {
        shipment_type: create.then_some("omniful_generated"),
        order_id: order.name.clone(),
        order_alias: feed.name.clone(),
        hub_code: hub_code.to_string(),
        order_items,
        billing_address: address.clone(),
        shipping_address: address,
        invoice: OmnifulInvoice {
            currency: feed.currency.to_string(),
            subtotal,
            shipping_price,
            discount,
            total: order.total_amount,
            total_paid,
            total_due,
            payment_method: order.payment_method.clone(),
        },
        customer: OmnifulOrderCustomer {
            id: customer_id.to_string(),
            first_name,
            last_name,
            mobile: clean_mobile(&feed.customer.invoice_phone),
            mobile_code: CALLING_CODE,
            email: feed.customer.email.clone(),
        },
        payment_method: if is_cod(&order.payment_method) || is_cod(&feed.payment_method) {
            "cod"
        } else {
            "prepaid"
        },
        require_shipping: true,
    })
}

/// Build the customer body.
#[must_use]
pub fn customer_payload(partner: &Partner) -> OmnifulCustomer {
    let (first_name, last_name) = split_name(&partner.name);
    OmnifulCustomer {
        address: OmnifulAddress {
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            address1: partner.street.clone(),
            address2: partner.street2.clone(),
            city: partner.city.clone(),
            zip: partner.zip.clone(),
            country_code: partner.country_code.clone(),
            phone: partner.phone.clone(),
        },
        first_name,
        last_name,
        email: partner.email.clone(),
        mobile: clean_mobile(&partner.phone),
        country_calling_code: CALLING_CODE,
        country_code: partner.country_code.clone(),
    }
}

/// Build the SKU body for a stocked product.
///
/// Products without an internal reference and service products are skipped.
#[must_use]
pub fn sku_payload(product: &Product) -> Option<OmnifulSku> {
    if product.is_service {
        return None;
    }
    let sku_code = product.default_code.clone()?;
    Some(OmnifulSku {
        name: product.name.clone(),
        sku_code,
        barcodes: product.barcode.iter().cloned().collect(),
        kind: "simple",
        status: "live",
        uom: "Units",
        retail_price: product.list_price,
        selling_price: product.list_price,
        is_perishable: false,
    })
}

fn order_item(line: &SaleOrderLine, product: Option<&Product>, subtotal: Decimal) -> OmnifulOrderItem {
    OmnifulOrderItem {
        sku_code: sku_code(line.product_id, product),
        name: product.map_or_else(|| line.name.clone(), |p| p.name.clone()),
        display_price: line.price_unit,
        selling_price: line.price_unit,
        unit_price: line.price_unit,
        quantity: line.quantity.round().to_i64().unwrap_or(i64::MAX),
        discount: line.discount_percent,
        subtotal,
        is_substituted: false,
    }
}

/// `price * quantity` less the line discount, or `None` on overflow.
fn line_subtotal(line: &SaleOrderLine) -> Option<Decimal> {
    let gross = line.price_unit.checked_mul(line.quantity)?;
    let kept = HUNDRED.checked_sub(line.discount_percent)?;
    gross.checked_mul(kept)?.checked_div(HUNDRED)
}

fn is_cod(method: &str) -> bool {
    method.trim().eq_ignore_ascii_case("cod")
}

/// First word, then the rest.
fn split_name(name: &str) -> (String, String) {
    let mut words = name.split_whitespace();
    let first = words.next().unwrap_or_default().to_string();
    let rest = words.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Drop a leading `+966`, `00966` or `966`, then keep digits only.
fn clean_mobile(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let code = CALLING_CODE.trim_start_matches('+');
    let local = compact
        .strip_prefix('+')
        .or_else(|| compact.strip_prefix("00"))
        .unwrap_or(&compact);
    let local = local.strip_prefix(code).unwrap_or(local);
    local.chars().filter(char::is_ascii_digit).collect()
}

//! Item lines.

use rust_decimal::Decimal;

use channel_sync_core::{CanonicalLine, LineSource, NO_VARIANTS, TaxDescriptor};

use super::NormalizerConfig;
use crate::payload::catalog::variant_key;
use crate::payload::{Amount, SallaItem};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Normalize one order item.
///
/// Never fails: missing amounts price the line at zero, and a zero quantity,
/// a zero base price or an overflowing ratio yields zero.
#[must_use]
pub fn normalize_item(item: &SallaItem, config: &NormalizerConfig) -> CanonicalLine {
    let amounts = item.amounts.clone().unwrap_or_default();
    let price_without_tax = amount(amounts.price_without_tax.as_ref());
    let total = amount(amounts.total.as_ref());
    let total_discount = amount(amounts.total_discount.as_ref());

    let quantity = match item.quantity {
        Some(q) if q >= Decimal::ZERO => q,
        _ => Decimal::ONE,
    };

    let unit_price = if price_without_tax > Decimal::ZERO {
        price_without_tax
    } else if total > Decimal::ZERO && quantity > Decimal::ZERO {
        total
            .checked_div(quantity)
            .map_or(Decimal::ZERO, |price| price.round_dp(6))
    } else {
        Decimal::ZERO
    };

    let discount_percent = if config.apply_item_discounts
        && !total_discount.is_zero()
        && !price_without_tax.is_zero()
        && !quantity.is_zero()
    {
        total_discount
            .checked_div(quantity)
            .and_then(|per_unit| per_unit.checked_div(price_without_tax))
            .and_then(|ratio| ratio.checked_mul(HUNDRED))
            .map_or(Decimal::ZERO, |percent| percent.round_dp(4))
    } else {
        Decimal::ZERO
    };

    let taxes = amounts
        .tax
        .as_ref()
        .and_then(crate::payload::TaxAmount::positive_percent)
        .map(|rate| vec![TaxDescriptor::percent(rate)])
        .unwrap_or_default();

    let product = item.product.clone().unwrap_or_default();
    let options = item.options.iter().filter_map(|o| o.id.clone()).collect();

    CanonicalLine {
        name: item
            .name
            .clone()
            .unwrap_or_else(|| config.unknown_product.clone()),
        product_ref: product.id,
        variant: variant_key(options).unwrap_or_else(|| NO_VARIANTS.to_owned()),
        sku: item.sku.clone().or(product.sku).unwrap_or_default(),
        barcode: product.barcode,
        unit_price,
        quantity,
        taxes,
        discount_percent,
        source: LineSource::Product,
    }
}

fn amount(value: Option<&Amount>) -> Decimal {
    value.map(Amount::value).unwrap_or_default()
}

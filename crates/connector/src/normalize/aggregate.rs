//! Order-level lines: shipping, cash on delivery, discounts and the empty-order
//! placeholder.

use rust_decimal::Decimal;

use channel_sync_core::{CanonicalLine, LineSource};

use super::NormalizerConfig;
use crate::payload::{Amount, OrderAmounts};

/// Append aggregate lines to `lines`, in order: shipping, cash on delivery,
/// then one line per discount. Only positive amounts produce a line.
///
/// If `lines` is still empty afterwards, a zero-priced placeholder is added so
/// an order always has at least one line.
pub fn append_aggregate_lines(
    lines: &mut Vec<CanonicalLine>,
    amounts: Option<&OrderAmounts>,
    config: &NormalizerConfig,
) {
    if let Some(amounts) = amounts {
        let shipping = positive(amounts.shipping_cost.as_ref());
        if let Some(price) = shipping {
            lines.push(CanonicalLine::synthetic(
                &config.shipping_label,
                price,
                LineSource::Delivery,
            ));
        }

        if let Some(price) = positive(amounts.cash_on_delivery.as_ref()) {
            lines.push(CanonicalLine::synthetic(
                &config.cod_label,
                price,
                LineSource::CashOnDelivery,
            ));
        }

        for discount in &amounts.discounts {
            let Some(price) = discount.discount.filter(|d| *d > Decimal::ZERO) else {
                continue;
            };
            let title = discount
                .title
                .as_deref()
                .or(discount.code.as_deref())
                .unwrap_or_default();
            lines.push(CanonicalLine::synthetic(
                format!("{}: {title}", config.discount_label),
                price,
                LineSource::Discount,
            ));
        }
    }

    if lines.is_empty() {
        lines.push(CanonicalLine::synthetic(
            &config.empty_order_label,
            Decimal::ZERO,
            LineSource::Placeholder,
        ));
    }
}

fn positive(amount: Option<&Amount>) -> Option<Decimal> {
    amount
        .and_then(|a| a.amount)
        .filter(|a| *a > Decimal::ZERO)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn amounts(value: serde_json::Value) -> OrderAmounts {
        serde_json::from_value(value).unwrap()
    }

    fn names(lines: &[CanonicalLine]) -> Vec<(&str, LineSource)> {
        lines.iter().map(|l| (l.name.as_str(), l.source)).collect()
    }

    #[test]
    fn test_fixed_order_of_aggregate_lines() {
        let mut lines = Vec::new();
        append_aggregate_lines(
            &mut lines,
            Some(&amounts(json!({
                "discounts": [
                    {"title": "Ramadan", "code": "RMD", "discount": "15"},
                    {"code": "VIP", "discount": 5},
                    {"title": "Zero", "discount": 0}
                ],
                "cash_on_delivery": {"amount": 10},
                "shipping_cost": {"amount": 25}
            }))),
            &NormalizerConfig::default(),
        );

        assert_eq!(
            names(&lines),
            vec![
                ("Shipping", LineSource::Delivery),
                ("Cash on Delivery", LineSource::CashOnDelivery),
                ("Discount: Ramadan", LineSource::Discount),
                ("Discount: VIP", LineSource::Discount),
            ]
        );
        assert_eq!(lines[0].unit_price, Decimal::from(25));
        assert_eq!(lines[0].quantity, Decimal::ONE);
        assert!(lines[1].taxes.is_empty());
        // Discounts stay positive until mapped onto an order.
        assert_eq!(lines[2].unit_price, Decimal::from(15));
    }

    #[test]
    fn test_placeholder_for_empty_order() {
        let mut lines = Vec::new();
        append_aggregate_lines(
            &mut lines,
            Some(&amounts(json!({"shipping_cost": {"amount": 0}}))),
            &NormalizerConfig::default(),
        );
        assert_eq!(names(&lines), vec![("Empty Order", LineSource::Placeholder)]);
        assert_eq!(lines[0].unit_price, Decimal::ZERO);

        let mut lines = Vec::new();
        append_aggregate_lines(&mut lines, None, &NormalizerConfig::default());
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_no_placeholder_when_items_exist() {
        let mut lines = vec![CanonicalLine::synthetic("Item", Decimal::ONE, LineSource::Product)];
        append_aggregate_lines(&mut lines, None, &NormalizerConfig::default());
        assert_eq!(lines.len(), 1);
    }
}

//! Order records as Salla sends them in webhooks and from `orders/{id}`.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::catalog::SallaCustomer;
use super::lenient;

/// `{"amount": .., "currency": ..}` money object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Amount {
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub amount: Option<Decimal>,
}

impl Amount {
    /// The amount, zero when absent.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.amount.unwrap_or_default()
    }
}

/// Tax block: a percentage plus the computed tax amount.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxAmount {
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub percent: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub amount: Option<Amount>,
}

impl TaxAmount {
    /// Positive tax percentage, if any.
    #[must_use]
    pub fn positive_percent(&self) -> Option<Decimal> {
        self.percent.filter(|p| *p > Decimal::ZERO)
    }
}

/// Per-item amounts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemAmounts {
    #[serde(deserialize_with = "lenient::object")]
    pub price_without_tax: Option<Amount>,
    #[serde(deserialize_with = "lenient::object")]
    pub total: Option<Amount>,
    #[serde(deserialize_with = "lenient::object")]
    pub tax: Option<TaxAmount>,
    #[serde(deserialize_with = "lenient::object")]
    pub total_discount: Option<Amount>,
}

/// Product reference inside an order item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemProduct {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sku: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub barcode: Option<String>,
}

/// Selected option value on an item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemOption {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
}

/// One order item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SallaItem {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sku: Option<String>,
    #[serde(deserialize_with = "lenient::opt_decimal")]
    pub quantity: Option<Decimal>,
    #[serde(deserialize_with = "lenient::object")]
    pub product: Option<ItemProduct>,
    #[serde(deserialize_with = "lenient::list")]
    pub options: Vec<ItemOption>,
    #[serde(deserialize_with = "lenient::object")]
    pub amounts: Option<ItemAmounts>,
}

/// Order-level discount entry (coupon or promotion).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscountEntry {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_decimal")]
    pub discount: Option<Decimal>,
}

/// Order totals.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderAmounts {
    #[serde(deserialize_with = "lenient::object")]
    pub sub_total: Option<Amount>,
    #[serde(deserialize_with = "lenient::object")]
    pub tax: Option<TaxAmount>,
    #[serde(deserialize_with = "lenient::object")]
    pub shipping_cost: Option<Amount>,
    #[serde(deserialize_with = "lenient::object")]
    pub cash_on_delivery: Option<Amount>,
    #[serde(deserialize_with = "lenient::list")]
    pub discounts: Vec<DiscountEntry>,
    #[serde(deserialize_with = "lenient::object")]
    pub total: Option<Amount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderDate {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderStatusRef {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingCompany {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
}

/// Shipping address as attached to an order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub street_number: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub shipping_address: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub postal_code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Shipping {
    #[serde(deserialize_with = "lenient::object")]
    pub company: Option<ShippingCompany>,
    #[serde(deserialize_with = "lenient::object")]
    pub address: Option<ShippingAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Shipment {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub courier_name: Option<String>,
}

/// A Salla order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SallaOrder {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub reference_id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub date: Option<OrderDate>,
    #[serde(deserialize_with = "lenient::object")]
    pub status: Option<OrderStatusRef>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub payment_method: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub customer: Option<SallaCustomer>,
    #[serde(deserialize_with = "lenient::object")]
    pub shipping: Option<Shipping>,
    #[serde(deserialize_with = "lenient::list")]
    pub shipments: Vec<Shipment>,
    #[serde(deserialize_with = "lenient::list")]
    pub items: Vec<SallaItem>,
    #[serde(deserialize_with = "lenient::object")]
    pub amounts: Option<OrderAmounts>,
}

impl SallaOrder {
    /// Carrier name from the shipping company, falling back to the first
    /// shipment's courier.
    #[must_use]
    pub fn carrier_name(&self) -> Option<&str> {
        self.shipping
            .as_ref()
            .and_then(|s| s.company.as_ref())
            .and_then(|c| c.name.as_deref())
            .or_else(|| {
                self.shipments
                    .first()
                    .and_then(|s| s.courier_name.as_deref())
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_order_fields() {
        let order: SallaOrder = serde_json::from_value(json!({
            "id": 2_093_117_510_i64,
            "reference_id": 64_543_212,
            "currency": "SAR",
            "shipping": [],
            "shipments": {"courier_name": "Aramex"},
            "items": [{
                "name": "Oud",
                "quantity": "2",
                "amounts": {
                    "price_without_tax": {"amount": "100.00"},
                    "tax": {"percent": "15%", "amount": {"amount": 30}},
                    "total_discount": {"amount": null}
                }
            }],
            "amounts": {"discounts": {"title": "Ramadan", "discount": "10"}}
        }))
        .unwrap();

        assert_eq!(order.id.as_deref(), Some("2093117510"));
        assert_eq!(order.reference_id.as_deref(), Some("64543212"));
        assert!(order.shipping.is_none());
        assert_eq!(order.carrier_name(), Some("Aramex"));

        let item = &order.items[0];
        assert_eq!(item.quantity, Some(Decimal::from(2)));
        let amounts = item.amounts.as_ref().unwrap();
        assert_eq!(
            amounts.tax.as_ref().unwrap().positive_percent(),
            Some(Decimal::from(15))
        );
        assert_eq!(amounts.total_discount.as_ref().unwrap().value(), Decimal::ZERO);

        let discounts = &order.amounts.as_ref().unwrap().discounts;
        assert_eq!(discounts.len(), 1);
        assert_eq!(discounts[0].discount, Some(Decimal::from(10)));
    }

    #[test]
    fn test_carrier_prefers_shipping_company() {
        let order: SallaOrder = serde_json::from_value(json!({
            "shipping": {"company": {"name": "SMSA"}},
            "shipments": [{"courier_name": "Aramex"}]
        }))
        .unwrap();
        assert_eq!(order.carrier_name(), Some("SMSA"));
    }
}

//! Customers, products and order statuses.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::lenient;
use super::order::Amount;

/// A Salla customer, either standalone (`customer.*` events) or embedded in an
/// order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SallaCustomer {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub full_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub mobile: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub mobile_code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub country_code: Option<String>,
}

impl SallaCustomer {
    /// `first_name last_name`, trimmed, or `full_name`. `None` when all are blank.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let joined = joined.trim();
        if joined.is_empty() {
            self.full_name.clone()
        } else {
            Some(joined.to_owned())
        }
    }

    /// Mobile prefixed with its dialing code (without `+`).
    #[must_use]
    pub fn invoice_phone(&self) -> Option<String> {
        let mobile = self.mobile.as_deref()?;
        let code = self
            .mobile_code
            .as_deref()
            .unwrap_or_default()
            .trim_start_matches('+');
        Some(format!("{code}{mobile}"))
    }
}

/// A sellable variant of a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SallaSku {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sku: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub barcode: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub price: Option<Amount>,
    /// Option value IDs selecting this variant.
    #[serde(deserialize_with = "lenient::list")]
    pub related_option_values: Vec<serde_json::Value>,
}

impl SallaSku {
    /// Variant key: the sorted option value IDs joined with `_`.
    ///
    /// Matches the key built for order items with the same options.
    #[must_use]
    pub fn variant_key(&self) -> Option<String> {
        let ids: Vec<String> = self
            .related_option_values
            .iter()
            .filter_map(lenient::value_to_string)
            .collect();
        variant_key(ids)
    }
}

/// Join option value IDs into a variant key, `None` when there are none.
pub(crate) fn variant_key(mut ids: Vec<String>) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    ids.sort_by(|a, b| match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    });
    Some(ids.join("_"))
}

/// A Salla product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SallaProduct {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sku: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub mpn: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub gtin: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub price: Option<Amount>,
    #[serde(deserialize_with = "lenient::list")]
    pub skus: Vec<SallaSku>,
}

impl SallaProduct {
    /// List price, zero when absent.
    #[must_use]
    pub fn list_price(&self) -> Decimal {
        self.price.as_ref().map(Amount::value).unwrap_or_default()
    }
}

/// Parent reference on a status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusParent {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
}

/// An entry of `orders/statuses`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SallaStatus {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub slug: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::opt_string")]
    pub status_type: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub sort: Option<i64>,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_active: bool,
    #[serde(deserialize_with = "lenient::object")]
    pub parent: Option<StatusParent>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_names_and_phone() {
        let customer: SallaCustomer = serde_json::from_value(json!({
            "id": 9,
            "first_name": "Sara ",
            "last_name": "",
            "mobile": 555_123_456,
            "mobile_code": "+966"
        }))
        .unwrap();
        assert_eq!(customer.display_name().as_deref(), Some("Sara"));
        assert_eq!(customer.invoice_phone().as_deref(), Some("966555123456"));

        let blank = SallaCustomer::default();
        assert_eq!(blank.display_name(), None);
        assert_eq!(blank.invoice_phone(), None);
    }

    #[test]
    fn test_variant_key_sorts_numerically() {
        let sku: SallaSku = serde_json::from_value(json!({
            "id": 1,
            "related_option_values": [120, "9", 33]
        }))
        .unwrap();
        assert_eq!(sku.variant_key().as_deref(), Some("9_33_120"));
        assert_eq!(SallaSku::default().variant_key(), None);
    }

    #[test]
    fn test_status_parent() {
        let status: SallaStatus = serde_json::from_value(json!({
            "id": 566_146_469,
            "name": "Shipped",
            "slug": "shipped",
            "type": "custom",
            "sort": 3,
            "is_active": true,
            "parent": {"id": "1298199463"}
        }))
        .unwrap();
        assert_eq!(status.parent.unwrap().id, Some(1_298_199_463));
        assert!(status.is_active);
    }
}

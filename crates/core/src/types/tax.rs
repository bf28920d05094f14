//! Tax descriptors as they arrive from platforms and staged feeds.
//!
//! Platforms disagree on key names, so a descriptor is read from a JSON object
//! by probing alternatives in a fixed order:
//!
//! | Field | Keys (first present wins) | Default |
//! |---|---|---|
//! | rate | `rate`, `tax_rate`, `value` | entry skipped |
//! | type | `type`, `tax_type` | `percent` |
//! | inclusive | `included_in_price`, `include_in_price`, `inclusive`, `included` | channel default |
//! | name | `name`, `tax_name` | generated |
//!
//! Serialized lists are parsed as JSON, never evaluated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::decimal::parse_decimal;

const RATE_KEYS: &[&str] = &["rate", "tax_rate", "value"];
const TYPE_KEYS: &[&str] = &["type", "tax_type"];
const INCLUSIVE_KEYS: &[&str] = &["included_in_price", "include_in_price", "inclusive", "included"];
const NAME_KEYS: &[&str] = &["name", "tax_name"];

/// How a tax amount is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaxAmountType {
    /// Percentage of the line price.
    #[default]
    Percent,
    /// Fixed amount per unit.
    Fixed,
    /// Percentage of the tax-included price.
    Division,
}

impl TaxAmountType {
    /// Stored name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Fixed => "fixed",
            Self::Division => "division",
        }
    }
}

impl std::fmt::Display for TaxAmountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaxAmountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "percentage" => Ok(Self::Percent),
            "fixed" | "amount" | "flat" => Ok(Self::Fixed),
            "division" => Ok(Self::Division),
            other => Err(format!("invalid tax type: {other}")),
        }
    }
}

/// Errors from parsing a serialized tax list.
#[derive(thiserror::Error, Debug)]
pub enum TaxParseError {
    /// The text is not valid JSON.
    #[error("tax list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The JSON is neither a list nor a single object.
    #[error("tax list must be a JSON array or object")]
    NotAList,
}

/// One tax applied to a line, before it is resolved to an internal tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxDescriptor {
    /// Tax rate (percent points for `Percent`).
    pub rate: Decimal,
    /// How the rate applies.
    #[serde(rename = "type")]
    pub amount_type: TaxAmountType,
    /// Whether the line price already includes this tax, when the platform says.
    #[serde(rename = "included_in_price", skip_serializing_if = "Option::is_none")]
    pub inclusive: Option<bool>,
    /// Platform tax name, when given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TaxDescriptor {
    /// A plain percentage tax with no inclusivity or name.
    #[must_use]
    pub const fn percent(rate: Decimal) -> Self {
        Self {
            rate,
            amount_type: TaxAmountType::Percent,
            inclusive: None,
            name: None,
        }
    }

    /// Read a descriptor from a JSON object.
    ///
    /// Returns `None` when the entry has no positive rate or an unknown type.
    #[must_use]
    pub fn from_entry(entry: &Map<String, Value>) -> Option<Self> {
        let rate = first_present(entry, RATE_KEYS).and_then(parse_decimal)?;
        if rate <= Decimal::ZERO {
            return None;
        }

        let amount_type = match first_present(entry, TYPE_KEYS) {
            None | Some(Value::Null) => TaxAmountType::Percent,
            Some(Value::String(s)) => s.parse().ok()?,
            Some(_) => return None,
        };

        let inclusive = first_present(entry, INCLUSIVE_KEYS).and_then(parse_flag);

        let name = first_present(entry, NAME_KEYS)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        Some(Self {
            rate: rate.normalize(),
            amount_type,
            inclusive,
            name,
        })
    }

    /// Read every usable descriptor from a list of JSON values.
    #[must_use]
    pub fn from_values(values: &[Value]) -> Vec<Self> {
        values
            .iter()
            .filter_map(Value::as_object)
            .filter_map(Self::from_entry)
            .collect()
    }
}

impl<'de> Deserialize<'de> for TaxDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entry = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_entry(&entry)
            .ok_or_else(|| serde::de::Error::custom("tax entry has no usable rate or type"))
    }
}

/// Parse a serialized tax list.
///
/// Blank input is an empty list. A single object is treated as a one-entry
/// list. Unusable entries are dropped.
///
/// # Errors
///
/// Returns an error if the text is not JSON or not a list/object.
pub fn parse_tax_list(raw: &str) -> Result<Vec<TaxDescriptor>, TaxParseError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(values) => Ok(TaxDescriptor::from_values(&values)),
        Value::Object(entry) => Ok(TaxDescriptor::from_entry(&entry).into_iter().collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(TaxParseError::NotAList),
    }
}

/// Rates of a tax list in ascending order.
#[must_use]
pub fn sorted_rates(taxes: &[TaxDescriptor]) -> Vec<Decimal> {
    let mut rates: Vec<Decimal> = taxes.iter().map(|t| t.rate).collect();
    rates.sort_unstable();
    rates
}

fn first_present<'a>(entry: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| entry.get(*key))
}

/// Interpret a loosely typed boolean. `null` means "not stated".
fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rate_key_precedence() {
        let tax = TaxDescriptor::from_entry(&entry(json!({"tax_rate": 5, "value": 7}))).unwrap();
        assert_eq!(tax.rate, Decimal::from(5));

        let tax = TaxDescriptor::from_entry(&entry(json!({"value": "15%"}))).unwrap();
        assert_eq!(tax.rate, Decimal::from(15));
        assert_eq!(tax.amount_type, TaxAmountType::Percent);
    }

    #[test]
    fn test_missing_or_zero_rate_is_skipped() {
        assert!(TaxDescriptor::from_entry(&entry(json!({"type": "percent"}))).is_none());
        assert!(TaxDescriptor::from_entry(&entry(json!({"rate": 0}))).is_none());
        assert!(TaxDescriptor::from_entry(&entry(json!({"rate": null, "tax_rate": 15}))).is_none());
    }

    #[test]
    fn test_inclusive_first_match_wins() {
        let tax = TaxDescriptor::from_entry(&entry(json!({
            "rate": 15,
            "inclusive": false,
            "included_in_price": true,
        })))
        .unwrap();
        assert_eq!(tax.inclusive, Some(true));

        let tax = TaxDescriptor::from_entry(&entry(json!({"rate": 15, "included": "0"}))).unwrap();
        assert_eq!(tax.inclusive, Some(false));

        let tax = TaxDescriptor::from_entry(&entry(json!({"rate": 15, "include_in_price": null})))
            .unwrap();
        assert_eq!(tax.inclusive, None);
    }

    #[test]
    fn test_type_and_name() {
        let tax = TaxDescriptor::from_entry(&entry(json!({
            "rate": "2.5",
            "tax_type": "fixed",
            "tax_name": " Eco fee ",
        })))
        .unwrap();
        assert_eq!(tax.amount_type, TaxAmountType::Fixed);
        assert_eq!(tax.name.as_deref(), Some("Eco fee"));

        assert!(TaxDescriptor::from_entry(&entry(json!({"rate": 5, "type": "group"}))).is_none());
    }

    #[test]
    fn test_parse_tax_list_shapes() {
        assert!(parse_tax_list("").unwrap().is_empty());
        assert!(parse_tax_list("[]").unwrap().is_empty());
        assert!(parse_tax_list("null").unwrap().is_empty());

        let list = parse_tax_list(r#"[{"rate": 15, "type": "percent"}, {"name": "x"}]"#).unwrap();
        assert_eq!(list, vec![TaxDescriptor::percent(Decimal::from(15))]);

        let single = parse_tax_list(r#"{"rate": "5"}"#).unwrap();
        assert_eq!(single.len(), 1);

        assert!(matches!(parse_tax_list("42"), Err(TaxParseError::NotAList)));
        assert!(matches!(
            parse_tax_list("[{'rate': 15}]"),
            Err(TaxParseError::Json(_))
        ));
    }

    #[test]
    fn test_serialized_list_parses_back() {
        let original = vec![TaxDescriptor {
            rate: Decimal::new(75, 1),
            amount_type: TaxAmountType::Percent,
            inclusive: Some(true),
            name: Some("VAT".to_string()),
        }];
        let text = serde_json::to_string(&original).unwrap();
        assert_eq!(parse_tax_list(&text).unwrap(), original);
    }

    #[test]
    fn test_sorted_rates() {
        let taxes = vec![
            TaxDescriptor::percent(Decimal::from(15)),
            TaxDescriptor::percent(Decimal::from(5)),
        ];
        assert_eq!(sorted_rates(&taxes), vec![Decimal::from(5), Decimal::from(15)]);
    }
}

//! Lenient decimal parsing for platform payloads.
//!
//! Salla sends amounts as JSON numbers, numeric strings, percent strings
//! (`"15%"`) or `null` depending on the endpoint and API version.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Parse a decimal from a loosely typed JSON value.
///
/// Returns `None` for `null`, booleans, containers and strings that are not
/// numeric once whitespace and a trailing `%` are removed.
#[must_use]
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

/// Parse a decimal from text, accepting a trailing `%` and scientific notation.
#[must_use]
pub fn parse_decimal_str(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
        .map(|d| d.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_and_string() {
        assert_eq!(parse_decimal(&serde_json::json!(15)), Some(Decimal::from(15)));
        assert_eq!(
            parse_decimal(&serde_json::json!("12.50")),
            Some(Decimal::new(125, 1))
        );
        assert_eq!(parse_decimal(&serde_json::json!(0.1)), Some(Decimal::new(1, 1)));
    }

    #[test]
    fn test_parse_percent_suffix() {
        assert_eq!(parse_decimal_str(" 15 % "), Some(Decimal::from(15)));
        assert_eq!(parse_decimal_str("15%"), Some(Decimal::from(15)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_decimal(&serde_json::Value::Null), None);
        assert_eq!(parse_decimal(&serde_json::json!(true)), None);
        assert_eq!(parse_decimal_str("abc"), None);
        assert_eq!(parse_decimal_str(""), None);
    }

    #[test]
    fn test_parse_scientific() {
        assert_eq!(parse_decimal_str("1e2"), Some(Decimal::from(100)));
    }
}

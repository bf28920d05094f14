//! Currency codes and decimal money amounts.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// The code is not exactly three characters.
    #[error("currency code must be 3 letters, got {0:?}")]
    WrongLength(String),
    /// The code contains something other than ASCII letters.
    #[error("currency code must be alphabetic, got {0:?}")]
    NotAlphabetic(String),
}

/// An ISO 4217 alphabetic currency code, stored upper-case.
///
/// ```
/// use channel_sync_core::CurrencyCode;
///
/// let sar: CurrencyCode = "sar".parse().unwrap_or_default();
/// assert_eq!(sar.as_str(), "SAR");
/// assert!("SA".parse::<CurrencyCode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Saudi riyal, the store default.
    pub const SAR: Self = Self(*b"SAR");

    /// Parse and upper-case a currency code.
    ///
    /// # Errors
    ///
    /// Returns an error unless the trimmed input is three ASCII letters.
    pub fn parse(raw: &str) -> Result<Self, CurrencyError> {
        let trimmed = raw.trim();
        let bytes: [u8; 3] = trimmed
            .as_bytes()
            .try_into()
            .map_err(|_| CurrencyError::WrongLength(trimmed.to_owned()))?;
        if !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(CurrencyError::NotAlphabetic(trimmed.to_owned()));
        }
        Ok(Self(bytes.map(|b| b.to_ascii_uppercase())))
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("XXX")
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::SAR
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_owned()
    }
}

/// An amount in a given currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (riyals, not halalas).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.round_dp(2), self.currency)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse_uppercases() {
        assert_eq!(CurrencyCode::parse(" usd ").unwrap().as_str(), "USD");
    }

    #[test]
    fn test_currency_parse_errors() {
        assert_eq!(
            CurrencyCode::parse("RIYAL"),
            Err(CurrencyError::WrongLength("RIYAL".to_string()))
        );
        assert_eq!(
            CurrencyCode::parse("S4R"),
            Err(CurrencyError::NotAlphabetic("S4R".to_string()))
        );
    }

    #[test]
    fn test_currency_serde_as_string() {
        let json = serde_json::to_string(&CurrencyCode::SAR).unwrap();
        assert_eq!(json, "\"SAR\"");
        let back: CurrencyCode = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(back.as_str(), "EUR");
        assert!(serde_json::from_str::<CurrencyCode>("\"EURO\"").is_err());
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(Decimal::new(12346, 3), CurrencyCode::SAR);
        assert_eq!(money.to_string(), "12.35 SAR");
        assert!(money.is_positive());
    }
}

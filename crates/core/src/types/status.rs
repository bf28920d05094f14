//! Status enums shared by the importer, storage and webhook layers.
//!
//! Each enum stores as its snake_case name (see `Display`/`FromStr`), which is
//! also its serde representation.

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` over a fixed name table.
macro_rules! string_enum {
    ($name:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Stored name of this value.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $what, ": {}"), s)),
                }
            }
        }
    };
}

/// Where a canonical order line came from.
///
/// Decides which internal product and taxes the line maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    /// A purchased item.
    Product,
    /// Shipping charge.
    Delivery,
    /// Order-level discount (priced positive, negated when mapped).
    Discount,
    /// Cash-on-delivery fee.
    CashOnDelivery,
    /// Zero-value line keeping an otherwise empty order valid.
    Placeholder,
}

string_enum!(LineSource, "line source" {
    Product => "product",
    Delivery => "delivery",
    Discount => "discount",
    CashOnDelivery => "cash_on_delivery",
    Placeholder => "placeholder",
});

/// Lifecycle of a staged feed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    #[default]
    Draft,
    Update,
    Done,
    Cancel,
    Error,
}

string_enum!(FeedState, "feed state" {
    Draft => "draft",
    Update => "update",
    Done => "done",
    Cancel => "cancel",
    Error => "error",
});

/// Internal sales order state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    #[default]
    Draft,
    Sale,
    Done,
    Cancel,
}

string_enum!(OrderState, "order state" {
    Draft => "draft",
    Sale => "sale",
    Done => "done",
    Cancel => "cancel",
});

/// Invoicing progress of an internal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    #[default]
    None,
    Open,
    Paid,
}

string_enum!(InvoiceState, "invoice state" {
    None => "none",
    Open => "open",
    Paid => "paid",
});

/// Outcome recorded in the sync log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Error,
}

string_enum!(SyncStatus, "sync status" {
    Success => "success",
    Error => "error",
});

/// Which platform a channel talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Salla,
    Omniful,
}

string_enum!(ChannelKind, "channel kind" {
    Salla => "salla",
    Omniful => "omniful",
});

/// Whether taxes on a channel default to price-inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefaultTaxType {
    Include,
    #[default]
    Exclude,
}

string_enum!(DefaultTaxType, "default tax type" {
    Include => "include",
    Exclude => "exclude",
});

impl DefaultTaxType {
    /// Price-inclusive flag for taxes that do not state one.
    #[must_use]
    pub const fn is_inclusive(self) -> bool {
        matches!(self, Self::Include)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_source_round_trip() {
        for source in [
            LineSource::Product,
            LineSource::Delivery,
            LineSource::Discount,
            LineSource::CashOnDelivery,
            LineSource::Placeholder,
        ] {
            assert_eq!(source.as_str().parse::<LineSource>(), Ok(source));
        }
        assert!("shipping".parse::<LineSource>().is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&LineSource::CashOnDelivery).unwrap_or_default();
        assert_eq!(json, "\"cash_on_delivery\"");
        assert_eq!(FeedState::Error.to_string(), "error");
    }

    #[test]
    fn test_from_str_error_message() {
        assert_eq!(
            "paid".parse::<OrderState>(),
            Err("invalid order state: paid".to_string())
        );
    }

    #[test]
    fn test_default_tax_type() {
        assert!(DefaultTaxType::Include.is_inclusive());
        assert!(!DefaultTaxType::default().is_inclusive());
    }
}

//! Sales channels and their per-channel status mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use channel_sync_core::{ChannelId, ChannelKind, CurrencyCode, DefaultTaxType, ProductId};

/// A connected storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Channel ID.
    pub id: ChannelId,
    /// Platform behind the channel.
    pub kind: ChannelKind,
    /// Display name.
    pub name: String,
    /// Inclusivity assumed for taxes that do not state it.
    pub default_tax_type: DefaultTaxType,
    /// Copy a uniform product tax set onto non-delivery lines when the order
    /// carries an untaxed discount.
    pub tax_on_discount_line: bool,
    /// Keep the store's order reference as the order name on updates.
    pub use_store_order_name: bool,
    /// Orders dated before this are acknowledged but not imported.
    pub order_start_date: Option<DateTime<Utc>>,
    /// Service product used for shipping lines without a carrier product.
    pub delivery_product_id: Option<ProductId>,
    /// Service product used for order-level discounts.
    pub discount_product_id: Option<ProductId>,
    /// Service product used for cash-on-delivery fees.
    pub cod_product_id: Option<ProductId>,
    /// Company currency.
    pub company_currency: CurrencyCode,
}

impl Channel {
    /// Whether taxes without an inclusive flag are treated as price-included.
    #[must_use]
    pub const fn taxes_included_by_default(&self) -> bool {
        self.default_tax_type.is_inclusive()
    }

    /// Whether an order placed at `date` falls before the channel start date.
    #[must_use]
    pub fn is_before_start(&self, date: DateTime<Utc>) -> bool {
        self.order_start_date.is_some_and(|start| date < start)
    }

    /// The configured product for a service slot, if any.
    #[must_use]
    pub const fn service_product(&self, slot: ServiceSlot) -> Option<ProductId> {
        match slot {
            ServiceSlot::Delivery => self.delivery_product_id,
            ServiceSlot::Discount => self.discount_product_id,
            ServiceSlot::CashOnDelivery => self.cod_product_id,
        }
    }

    /// Fill a service slot.
    pub const fn set_service_product(&mut self, slot: ServiceSlot, product_id: ProductId) {
        let target = match slot {
            ServiceSlot::Delivery => &mut self.delivery_product_id,
            ServiceSlot::Discount => &mut self.discount_product_id,
            ServiceSlot::CashOnDelivery => &mut self.cod_product_id,
        };
        *target = Some(product_id);
    }
}

/// Channel-level service products created on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceSlot {
    Delivery,
    Discount,
    CashOnDelivery,
}

impl ServiceSlot {
    /// Name given to the product when the slot is first filled.
    #[must_use]
    pub const fn product_name(self) -> &'static str {
        match self {
            Self::Delivery => "Delivery",
            Self::Discount => "Discount",
            Self::CashOnDelivery => "Cash on Delivery",
        }
    }

    /// Column/slot name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Discount => "discount",
            Self::CashOnDelivery => "cod",
        }
    }
}

/// What a store status slug means for the internal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOrderState {
    pub channel_id: ChannelId,
    /// Store status slug, e.g. `completed`.
    pub store_slug: String,
    /// Confirm the order.
    pub confirm: bool,
    /// Open an invoice.
    pub invoice: bool,
    /// Mark the invoice paid (implies `invoice`).
    pub invoice_paid: bool,
    /// Mark the order shipped.
    pub ship: bool,
    /// Cancel the order.
    pub cancel: bool,
    /// Register a payment directly against the order.
    pub make_payment: bool,
}

impl ChannelOrderState {
    /// Mapping with no actions for `slug`.
    #[must_use]
    pub fn new(channel_id: ChannelId, slug: impl Into<String>) -> Self {
        Self {
            channel_id,
            store_slug: slug.into(),
            confirm: false,
            invoice: false,
            invoice_paid: false,
            ship: false,
            cancel: false,
            make_payment: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn channel() -> Channel {
        Channel {
            id: ChannelId::new(1),
            kind: ChannelKind::Salla,
            name: "Salla".to_string(),
            default_tax_type: DefaultTaxType::Include,
            tax_on_discount_line: false,
            use_store_order_name: true,
            order_start_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            delivery_product_id: Some(ProductId::new(9)),
            discount_product_id: None,
            cod_product_id: None,
            company_currency: CurrencyCode::SAR,
        }
    }

    #[test]
    fn test_start_date_gate() {
        let channel = channel();
        assert!(channel.is_before_start(Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap()));
        assert!(!channel.is_before_start(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));

        let open = Channel {
            order_start_date: None,
            ..channel
        };
        assert!(!open.is_before_start(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_service_product_slots() {
        let channel = channel();
        assert!(channel.taxes_included_by_default());
        assert_eq!(
            channel.service_product(ServiceSlot::Delivery),
            Some(ProductId::new(9))
        );
        assert_eq!(channel.service_product(ServiceSlot::Discount), None);
    }
}

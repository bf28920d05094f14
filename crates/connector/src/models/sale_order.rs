//! Internal sales orders, their store mappings and payments.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use channel_sync_core::{
    CarrierId, ChannelId, InvoiceState, LineSource, OrderMappingId, OrderState, PartnerId,
    PaymentId, PricelistId, ProductId, SaleOrderId, TaxId,
};

/// A sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrder {
    pub id: SaleOrderId,
    pub name: String,
    pub channel_id: ChannelId,
    pub partner_id: PartnerId,
    pub pricelist_id: PricelistId,
    pub carrier_id: Option<CarrierId>,
    pub date_order: Option<DateTime<FixedOffset>>,
    pub payment_method: String,
    pub state: OrderState,
    pub invoice_state: InvoiceState,
    pub shipped: bool,
    /// Total as reported by the store.
    pub total_amount: Decimal,
    pub lines: Vec<SaleOrderLine>,
}

impl SaleOrder {
    /// Only draft orders accept rewritten lines.
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        matches!(self.state, OrderState::Draft)
    }
}

/// One line of a sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrderLine {
    pub name: String,
    pub product_id: ProductId,
    pub price_unit: Decimal,
    pub quantity: Decimal,
    pub discount_percent: Decimal,
    pub tax_ids: Vec<TaxId>,
    pub source: LineSource,
}

/// Header and lines for creating or rewriting an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSaleOrder {
    pub name: String,
    pub channel_id: ChannelId,
    pub partner_id: PartnerId,
    pub pricelist_id: PricelistId,
    pub carrier_id: Option<CarrierId>,
    pub date_order: Option<DateTime<FixedOffset>>,
    pub payment_method: String,
    pub total_amount: Decimal,
    pub lines: Vec<SaleOrderLine>,
}

/// State changes applied by status sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderStateUpdate {
    pub state: OrderState,
    pub invoice_state: InvoiceState,
    pub shipped: bool,
}

impl From<&SaleOrder> for OrderStateUpdate {
    fn from(order: &SaleOrder) -> Self {
        Self {
            state: order.state,
            invoice_state: order.invoice_state,
            shipped: order.shipped,
        }
    }
}

/// Link between a store order and an internal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMapping {
    pub id: OrderMappingId,
    pub channel_id: ChannelId,
    /// Platform order ID.
    pub store_order_id: String,
    pub sale_order_id: SaleOrderId,
    /// Where the order came from (`webhook`, `api`, `file`).
    pub store_source: String,
    /// Last store status slug seen for this order.
    pub store_status: String,
}

/// Fields for a new order mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderMapping {
    pub channel_id: ChannelId,
    pub store_order_id: String,
    pub sale_order_id: SaleOrderId,
    pub store_source: String,
    pub store_status: String,
}

/// A payment registered directly against an order, without an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub sale_order_id: SaleOrderId,
    /// Order name; at most one payment exists per memo.
    pub memo: String,
    pub amount: Decimal,
    /// Payment method reported by the store, used as the journal name.
    pub journal: String,
    pub paid_at: DateTime<Utc>,
}

/// Fields for a new payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub sale_order_id: SaleOrderId,
    pub memo: String,
    pub amount: Decimal,
    pub journal: String,
    pub paid_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_update_mirrors_order() {
        let order = SaleOrder {
            id: SaleOrderId::new(1),
            name: "1001".to_string(),
            channel_id: ChannelId::new(1),
            partner_id: PartnerId::new(1),
            pricelist_id: PricelistId::new(1),
            carrier_id: None,
            date_order: None,
            payment_method: "cod".to_string(),
            state: OrderState::Draft,
            invoice_state: InvoiceState::None,
            shipped: false,
            total_amount: Decimal::from(80),
            lines: vec![],
        };
        assert!(order.is_draft());

        let update = OrderStateUpdate::from(&order);
        assert_eq!(update.state, OrderState::Draft);
        assert_eq!(update.invoice_state, InvoiceState::None);
        assert!(!update.shipped);
    }
}

//! Links between internal records and their fulfillment platform copies.

use channel_sync_core::{PartnerId, ProductId, SaleOrderId};

/// Kind of record sent to the fulfillment platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FulfillmentRecord {
    Order,
    Customer,
    Sku,
}

impl FulfillmentRecord {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Customer => "customer",
            Self::Sku => "sku",
        }
    }
}

/// Internal side of a fulfillment link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FulfillmentKey {
    pub record: FulfillmentRecord,
    pub local_id: i32,
}

impl FulfillmentKey {
    #[must_use]
    pub const fn order(id: SaleOrderId) -> Self {
        Self {
            record: FulfillmentRecord::Order,
            local_id: id.as_i32(),
        }
    }

    #[must_use]
    pub const fn customer(id: PartnerId) -> Self {
        Self {
            record: FulfillmentRecord::Customer,
            local_id: id.as_i32(),
        }
    }

    #[must_use]
    pub const fn sku(id: ProductId) -> Self {
        Self {
            record: FulfillmentRecord::Sku,
            local_id: id.as_i32(),
        }
    }
}

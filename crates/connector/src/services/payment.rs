//! Direct payments for orders whose store status says they are paid.
//!
//! The payment is recorded against the order itself rather than against an
//! invoice, one per order name.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use channel_sync_core::OrderFeed;

use crate::db::{RepositoryError, Store};
use crate::models::{NewPayment, Payment, SaleOrder};

/// Record a payment for `order` unless one exists for its name.
///
/// The amount is the feed total, or the order total when the feed has none.
/// Nothing is recorded for a non-positive amount.
///
/// # Errors
///
/// Returns `RepositoryError` if the lookup or insert fails.
#[instrument(skip(store, order, feed), fields(sale_order_id = %order.id, memo = %order.name))]
pub async fn register_payment<S: Store + ?Sized>(
    store: &S,
    order: &SaleOrder,
    feed: &OrderFeed,
) -> Result<Option<Payment>, RepositoryError> {
    if store.find_payment_by_memo(&order.name).await?.is_some() {
        return Ok(None);
    }

    let amount = if feed.total_amount > Decimal::ZERO {
        feed.total_amount
    } else {
        order.total_amount
    };
    if amount <= Decimal::ZERO {
        tracing::info!("Skipping payment with non-positive amount");
        return Ok(None);
    }

    let payment = NewPayment {
        sale_order_id: order.id,
        memo: order.name.clone(),
        amount,
        journal: feed.payment_method.clone(),
        paid_at: Utc::now(),
    };

    match store.create_payment(&payment).await {
        Ok(created) => {
            tracing::info!(amount = %created.amount, journal = %created.journal, "Registered payment");
            Ok(Some(created))
        }
        // Another delivery of the same order got there first.
        Err(RepositoryError::Conflict(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewSaleOrder;
    use channel_sync_core::{
        AddressInfo, ChannelId, CurrencyCode, CustomerInfo, PartnerId, PricelistId,
    };

    fn feed(total: i64) -> OrderFeed {
        OrderFeed {
            store_id: "55".to_string(),
            name: "1001".to_string(),
            store_source: "webhook".to_string(),
            currency: CurrencyCode::SAR,
            date_order: None,
            status_slug: "completed".to_string(),
            payment_method: "mada".to_string(),
            carrier: None,
            customer: CustomerInfo::default(),
            address: AddressInfo::default(),
            lines: vec![],
            total_amount: Decimal::from(total),
        }
    }

    async fn order(store: &MemoryStore, total: i64) -> SaleOrder {
        store
            .create_sale_order(&NewSaleOrder {
                name: "1001".to_string(),
                channel_id: ChannelId::new(1),
                partner_id: PartnerId::new(1),
                pricelist_id: PricelistId::new(1),
                carrier_id: None,
                date_order: None,
                payment_method: "mada".to_string(),
                total_amount: Decimal::from(total),
                lines: vec![],
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_registers_once_per_memo() {
        let store = MemoryStore::new();
        let order = order(&store, 0).await;

        let first = register_payment(&store, &order, &feed(250)).await.unwrap();
        let payment = first.unwrap();
        assert_eq!(payment.amount, Decimal::from(250));
        assert_eq!(payment.journal, "mada");
        assert_eq!(payment.memo, "1001");

        let second = register_payment(&store, &order, &feed(250)).await.unwrap();
        assert!(second.is_none());
        assert_eq!(store.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_order_total() {
        let store = MemoryStore::new();
        let order = order(&store, 90).await;
        let payment = register_payment(&store, &order, &feed(0)).await.unwrap();
        assert_eq!(payment.unwrap().amount, Decimal::from(90));
    }

    #[tokio::test]
    async fn test_skips_zero_amount() {
        let store = MemoryStore::new();
        let order = order(&store, 0).await;
        assert!(register_payment(&store, &order, &feed(0)).await.unwrap().is_none());
        assert!(store.payments().await.is_empty());
    }
}

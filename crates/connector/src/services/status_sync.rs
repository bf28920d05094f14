//! Store status slug → internal order actions.
//!
//! Each channel maps store slugs to a set of actions (confirm, invoice, paid,
//! ship, cancel). Invoicing or shipping an unconfirmed order confirms it
//! first. Cancelled orders are never touched.

use tracing::instrument;

use channel_sync_core::{ChannelId, InvoiceState, OrderState};

use crate::db::{RepositoryError, Store};
use crate::models::{ChannelOrderState, OrderStateUpdate, SaleOrder};

/// Actions that changed the order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedActions {
    pub confirmed: bool,
    pub invoiced: bool,
    pub paid: bool,
    pub shipped: bool,
    pub cancelled: bool,
}

impl AppliedActions {
    #[must_use]
    pub const fn any(&self) -> bool {
        self.confirmed || self.invoiced || self.paid || self.shipped || self.cancelled
    }
}

/// Result of syncing one order's status.
#[derive(Debug, Clone, Default)]
pub struct StatusSync {
    /// The slug's mapping, if the channel has one.
    pub mapping: Option<ChannelOrderState>,
    pub applied: AppliedActions,
    /// Message fragment for the feed, if any.
    pub message: Option<String>,
}

/// Work out the state an order should move to under `mapping`.
#[must_use]
pub fn plan(order: &SaleOrder, mapping: &ChannelOrderState) -> (OrderStateUpdate, AppliedActions) {
    let mut update = OrderStateUpdate::from(order);
    let mut applied = AppliedActions::default();

    if order.state == OrderState::Cancel {
        return (update, applied);
    }

    if mapping.cancel {
        update.state = OrderState::Cancel;
        applied.cancelled = true;
        return (update, applied);
    }

    let wants_confirm = mapping.confirm || mapping.invoice || mapping.invoice_paid || mapping.ship;
    if wants_confirm && update.state == OrderState::Draft {
        update.state = OrderState::Sale;
        applied.confirmed = true;
    }

    if (mapping.invoice || mapping.invoice_paid) && update.invoice_state == InvoiceState::None {
        update.invoice_state = InvoiceState::Open;
        applied.invoiced = true;
    }

    if mapping.invoice_paid && update.invoice_state != InvoiceState::Paid {
        update.invoice_state = InvoiceState::Paid;
        applied.paid = true;
    }

    if mapping.ship && !update.shipped {
        update.shipped = true;
        applied.shipped = true;
    }

    (update, applied)
}

/// Apply the channel's mapping for `slug` to `order`.
///
/// A slug without a mapping leaves the order as it is and says so in the
/// message.
///
/// # Errors
///
/// Returns `RepositoryError` if loading the mapping or saving the order fails.
#[instrument(skip(store, order), fields(sale_order_id = %order.id))]
pub async fn sync_order_status<S: Store + ?Sized>(
    store: &S,
    channel_id: ChannelId,
    order: &SaleOrder,
    slug: &str,
) -> Result<StatusSync, RepositoryError> {
    let Some(mapping) = store.get_order_state(channel_id, slug).await? else {
        tracing::info!("No status mapping for slug");
        return Ok(StatusSync {
            message: Some(format!("<br/> No status mapping for {slug}")),
            ..StatusSync::default()
        });
    };

    let (update, applied) = plan(order, &mapping);
    if applied.any() {
        store.update_order_state(order.id, update).await?;
        tracing::info!(?applied, "Applied store status to order");
    }

    Ok(StatusSync {
        mapping: Some(mapping),
        applied,
        message: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewSaleOrder;
    use channel_sync_core::{PartnerId, PricelistId};
    use rust_decimal::Decimal;

    fn mapping(configure: impl FnOnce(&mut ChannelOrderState)) -> ChannelOrderState {
        let mut state = ChannelOrderState::new(ChannelId::new(1), "completed");
        configure(&mut state);
        state
    }

    async fn draft_order(store: &MemoryStore) -> SaleOrder {
        store
            .create_sale_order(&NewSaleOrder {
                name: "1001".to_string(),
                channel_id: ChannelId::new(1),
                partner_id: PartnerId::new(1),
                pricelist_id: PricelistId::new(1),
                carrier_id: None,
                date_order: None,
                payment_method: "cod".to_string(),
                total_amount: Decimal::from(100),
                lines: vec![],
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_paid_implies_confirm_and_invoice() {
        let store = MemoryStore::new();
        let order = draft_order(&store).await;
        let (update, applied) = plan(&order, &mapping(|m| m.invoice_paid = true));

        assert_eq!(update.state, OrderState::Sale);
        assert_eq!(update.invoice_state, InvoiceState::Paid);
        assert!(applied.confirmed && applied.invoiced && applied.paid);
        assert!(!applied.shipped);
    }

    #[tokio::test]
    async fn test_cancel_wins_and_cancelled_is_final() {
        let store = MemoryStore::new();
        let mut order = draft_order(&store).await;
        let (update, applied) = plan(
            &order,
            &mapping(|m| {
                m.cancel = true;
                m.ship = true;
            }),
        );
        assert_eq!(update.state, OrderState::Cancel);
        assert!(applied.cancelled && !applied.shipped);

        order.state = OrderState::Cancel;
        let (_, applied) = plan(&order, &mapping(|m| m.confirm = true));
        assert!(!applied.any());
    }

    #[tokio::test]
    async fn test_sync_persists_state() {
        let store = MemoryStore::new();
        let order = draft_order(&store).await;
        store
            .insert_order_state(mapping(|m| {
                m.confirm = true;
                m.ship = true;
            }))
            .await;

        let sync = sync_order_status(&store, ChannelId::new(1), &order, "completed")
            .await
            .unwrap();
        assert!(sync.applied.shipped);
        assert!(sync.message.is_none());

        let saved = store.get_sale_order(order.id).await.unwrap().unwrap();
        assert_eq!(saved.state, OrderState::Sale);
        assert!(saved.shipped);
    }

    #[tokio::test]
    async fn test_unmapped_slug_leaves_order() {
        let store = MemoryStore::new();
        let order = draft_order(&store).await;
        let sync = sync_order_status(&store, ChannelId::new(1), &order, "in_progress")
            .await
            .unwrap();

        assert!(sync.mapping.is_none());
        assert_eq!(
            sync.message.as_deref(),
            Some("<br/> No status mapping for in_progress")
        );
        let saved = store.get_sale_order(order.id).await.unwrap().unwrap();
        assert_eq!(saved.state, OrderState::Draft);
    }
}

//! Per-platform hooks that run after an order is imported.
//!
//! Each channel kind registers its [`ChannelStrategy`]s in the
//! [`StrategyRegistry`]; they run in registration order. Kinds without a
//! strategy get no hooks.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::instrument;

use channel_sync_core::{ChannelKind, OrderFeed};

use super::status_sync::AppliedActions;
use crate::db::{RepositoryError, Store};
use crate::models::{Channel, SaleOrder};
use crate::omniful::OmnifulError;
use crate::salla::{SallaError, StatusPusher};

/// Errors from strategy hooks.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Salla(#[from] SallaError),

    #[error(transparent)]
    Omniful(#[from] OmnifulError),

    #[error(transparent)]
    Database(#[from] RepositoryError),

    /// The channel has no status mapping for the slug to push.
    #[error("no order state mapping for [{0}] in channel configuration")]
    NoStatusMapping(String),

    /// `completed` may only be pushed when its mapping marks invoices paid.
    #[error("order state mapping for 'completed' must set the invoice as paid")]
    CompletedRequiresPaid,
}

/// What a hook gets to see.
pub struct HookContext<'a> {
    pub store: &'a dyn Store,
    pub channel: &'a Channel,
    /// The feed the order was imported from.
    pub feed: &'a OrderFeed,
    pub order: &'a SaleOrder,
}

/// Platform-specific reactions to an import.
#[async_trait]
pub trait ChannelStrategy: Send + Sync {
    /// Runs after every successful import.
    async fn after_import(&self, _ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        Ok(())
    }

    /// The order's invoice was marked paid.
    async fn on_invoice_paid(&self, _ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        Ok(())
    }

    /// The order was shipped.
    async fn on_shipped(&self, _ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        Ok(())
    }

    /// The order was cancelled.
    async fn on_cancelled(&self, _ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        Ok(())
    }
}

/// Strategies by channel kind.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ChannelKind, Vec<Arc<dyn ChannelStrategy>>>,
}

impl StrategyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a strategy for `kind`, after any already registered.
    #[must_use]
    pub fn with(mut self, kind: ChannelKind, strategy: Arc<dyn ChannelStrategy>) -> Self {
        self.strategies.entry(kind).or_default().push(strategy);
        self
    }

    #[must_use]
    pub fn strategies_for(&self, kind: ChannelKind) -> &[Arc<dyn ChannelStrategy>] {
        self.strategies.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Run the hooks matching `applied` for each of the channel's strategies.
    ///
    /// Hook failures are logged and returned as a message fragment; they never
    /// fail the import.
    #[instrument(skip_all, fields(channel_id = %ctx.channel.id, store_id = %ctx.feed.store_id))]
    pub async fn run_hooks(&self, ctx: &HookContext<'_>, applied: AppliedActions) -> Option<String> {
        let mut failures = Vec::new();
        let mut record = |hook: &str, result: Result<(), StrategyError>| {
            if let Err(e) = result {
                tracing::warn!(hook, error = %e, "Channel hook failed");
                failures.push(format!("<br/>{hook}: {e}"));
            }
        };

        for strategy in self.strategies_for(ctx.channel.kind) {
            record("after_import", strategy.after_import(ctx).await);
            if applied.paid {
                record("on_invoice_paid", strategy.on_invoice_paid(ctx).await);
            }
            if applied.shipped {
                record("on_shipped", strategy.on_shipped(ctx).await);
            }
            if applied.cancelled {
                record("on_cancelled", strategy.on_cancelled(ctx).await);
            }
        }

        (!failures.is_empty()).then(|| failures.concat())
    }
}

/// Salla: mirror paid, shipped and cancelled orders back to the store.
pub struct SallaStrategy {
    pusher: Option<Arc<dyn StatusPusher>>,
}

impl SallaStrategy {
    /// Without a pusher every hook is a no-op (no API credentials configured).
    #[must_use]
    pub fn new(pusher: Option<Arc<dyn StatusPusher>>) -> Self {
        Self { pusher }
    }

    async fn push(&self, ctx: &HookContext<'_>, slug: &str) -> Result<(), StrategyError> {
        let Some(pusher) = self.pusher.as_ref() else {
            return Ok(());
        };
        // The store already reports this status.
        if ctx.feed.status_slug == slug {
            return Ok(());
        }

        let mapping = ctx
            .store
            .get_order_state(ctx.channel.id, slug)
            .await?
            .ok_or_else(|| StrategyError::NoStatusMapping(slug.to_string()))?;
        if slug == "completed" && !mapping.invoice_paid {
            return Err(StrategyError::CompletedRequiresPaid);
        }

        pusher.push_status(&ctx.feed.store_id, slug).await?;
        Ok(())
    }
}

#[async_trait]
impl ChannelStrategy for SallaStrategy {
    async fn on_invoice_paid(&self, ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        self.push(ctx, "completed").await
    }

    async fn on_shipped(&self, ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        self.push(ctx, "delivered").await
    }

    async fn on_cancelled(&self, ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        self.push(ctx, "canceled").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::ChannelOrderState;
    use channel_sync_core::{
        AddressInfo, ChannelId, CurrencyCode, CustomerInfo, DefaultTaxType, InvoiceState,
        OrderState, PartnerId, PricelistId, SaleOrderId,
    };
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingPusher {
        pushed: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl StatusPusher for RecordingPusher {
        async fn push_status(&self, store_order_id: &str, slug: &str) -> Result<(), SallaError> {
            self.pushed
                .lock()
                .await
                .push((store_order_id.to_string(), slug.to_string()));
            Ok(())
        }
    }

    fn channel() -> Channel {
        Channel {
            id: ChannelId::new(1),
            kind: ChannelKind::Salla,
            name: "Salla".to_string(),
            default_tax_type: DefaultTaxType::Exclude,
            tax_on_discount_line: false,
            use_store_order_name: false,
            order_start_date: None,
            delivery_product_id: None,
            discount_product_id: None,
            cod_product_id: None,
            company_currency: CurrencyCode::SAR,
        }
    }

    fn order() -> SaleOrder {
        SaleOrder {
            id: SaleOrderId::new(7),
            name: "1001".to_string(),
            channel_id: ChannelId::new(1),
            partner_id: PartnerId::new(1),
            pricelist_id: PricelistId::new(1),
            carrier_id: None,
            date_order: None,
            payment_method: "cod".to_string(),
            state: OrderState::Sale,
            invoice_state: InvoiceState::Paid,
            shipped: true,
            total_amount: Decimal::from(10),
            lines: vec![],
        }
    }

    fn feed(slug: &str) -> OrderFeed {
        OrderFeed {
            store_id: "55".to_string(),
            name: "1001".to_string(),
            store_source: "webhook".to_string(),
            currency: CurrencyCode::SAR,
            date_order: None,
            status_slug: slug.to_string(),
            payment_method: "cod".to_string(),
            carrier: None,
            customer: CustomerInfo::default(),
            address: AddressInfo::default(),
            lines: vec![],
            total_amount: Decimal::from(10),
        }
    }

    fn registry(pusher: &Arc<RecordingPusher>) -> StrategyRegistry {
        let pusher: Arc<dyn StatusPusher> = pusher.clone();
        StrategyRegistry::new().with(
            ChannelKind::Salla,
            Arc::new(SallaStrategy::new(Some(pusher))),
        )
    }

    #[tokio::test]
    async fn test_pushes_mapped_slugs() {
        let store = MemoryStore::new();
        let mut completed = ChannelOrderState::new(ChannelId::new(1), "completed");
        completed.invoice_paid = true;
        store.insert_order_state(completed).await;
        store
            .insert_order_state(ChannelOrderState::new(ChannelId::new(1), "delivered"))
            .await;

        let pusher = Arc::new(RecordingPusher::default());
        let (channel, order) = (channel(), order());
        let ctx = HookContext {
            store: &store,
            channel: &channel,
            feed: &feed("under_review"),
            order: &order,
        };
        let applied = AppliedActions {
            paid: true,
            shipped: true,
            ..AppliedActions::default()
        };

        let failures = registry(&pusher).run_hooks(&ctx, applied).await;
        assert!(failures.is_none());
        assert_eq!(
            *pusher.pushed.lock().await,
            vec![
                ("55".to_string(), "completed".to_string()),
                ("55".to_string(), "delivered".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_refuses_completed_without_paid_mapping() {
        let store = MemoryStore::new();
        store
            .insert_order_state(ChannelOrderState::new(ChannelId::new(1), "completed"))
            .await;

        let pusher = Arc::new(RecordingPusher::default());
        let (channel, order) = (channel(), order());
        let ctx = HookContext {
            store: &store,
            channel: &channel,
            feed: &feed("under_review"),
            order: &order,
        };
        let applied = AppliedActions {
            paid: true,
            cancelled: true,
            ..AppliedActions::default()
        };

        let failures = registry(&pusher).run_hooks(&ctx, applied).await.unwrap();
        assert!(failures.contains("must set the invoice as paid"));
        assert!(failures.contains("no order state mapping for [canceled]"));
        assert!(pusher.pushed.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_does_not_echo_incoming_slug() {
        let store = MemoryStore::new();
        store
            .insert_order_state(ChannelOrderState::new(ChannelId::new(1), "delivered"))
            .await;
        let pusher = Arc::new(RecordingPusher::default());
        let (channel, order) = (channel(), order());
        let ctx = HookContext {
            store: &store,
            channel: &channel,
            feed: &feed("delivered"),
            order: &order,
        };
        let applied = AppliedActions {
            shipped: true,
            ..AppliedActions::default()
        };
        assert!(registry(&pusher).run_hooks(&ctx, applied).await.is_none());
        assert!(pusher.pushed.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_noop() {
        let store = MemoryStore::new();
        let mut channel = channel();
        channel.kind = ChannelKind::Omniful;
        let order = order();
        let ctx = HookContext {
            store: &store,
            channel: &channel,
            feed: &feed("completed"),
            order: &order,
        };
        let pusher = Arc::new(RecordingPusher::default());
        let applied = AppliedActions {
            cancelled: true,
            ..AppliedActions::default()
        };
        assert!(registry(&pusher).run_hooks(&ctx, applied).await.is_none());
    }
}

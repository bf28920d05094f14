//! Forwarding imported orders to Omniful for fulfillment.
//!
//! Each pushed record is linked to its remote ID in storage, so a customer or
//! SKU is created once and a re-imported draft order is updated in place.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use channel_sync_core::{LineSource, OrderState, ProductId};

use super::strategy::{ChannelStrategy, HookContext, StrategyError};
use crate::db::RepositoryError;
use crate::models::{FulfillmentKey, Product};
use crate::omniful::payload::{customer_payload, order_payload, sku_payload};
use crate::omniful::FulfillmentPusher;

/// Reason sent with every cancellation.
pub const CANCEL_REASON: &str = "Cancelled in store";

/// Pushes the imported order, its customer and its SKUs to Omniful.
pub struct OmnifulStrategy {
    pusher: Arc<dyn FulfillmentPusher>,
    hub_code: String,
}

impl OmnifulStrategy {
    #[must_use]
    pub fn new(pusher: Arc<dyn FulfillmentPusher>, hub_code: impl Into<String>) -> Self {
        Self {
            pusher,
            hub_code: hub_code.into(),
        }
    }

    /// Remote customer ID, creating the customer on first use.
    async fn sync_customer(&self, ctx: &HookContext<'_>) -> Result<String, StrategyError> {
        let key = FulfillmentKey::customer(ctx.order.partner_id);
        if let Some(remote) = ctx.store.get_fulfillment_link(&key).await? {
            return Ok(remote);
        }

        let partner = ctx
            .store
            .get_partner(ctx.order.partner_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let remote = self
            .pusher
            .create_customer(&customer_payload(&partner))
            .await?
            .unwrap_or_else(|| partner.store_id.clone());
        ctx.store.set_fulfillment_link(&key, &remote).await?;
        Ok(remote)
    }

    /// Load the order's products and create the SKUs not yet linked.
    async fn sync_skus(
        &self,
        ctx: &HookContext<'_>,
    ) -> Result<HashMap<ProductId, Product>, StrategyError> {
        let mut products = HashMap::new();
        for line in &ctx.order.lines {
            if line.source != LineSource::Product || products.contains_key(&line.product_id) {
                continue;
            }
            if let Some(product) = ctx.store.get_product(line.product_id).await? {
                products.insert(line.product_id, product);
            }
        }

        let mut pending = Vec::new();
        for product in products.values() {
            let key = FulfillmentKey::sku(product.id);
            if ctx.store.get_fulfillment_link(&key).await?.is_some() {
                continue;
            }
            if let Some(sku) = sku_payload(product) {
                pending.push((key, sku));
            }
        }

        if !pending.is_empty() {
            let skus: Vec<_> = pending.iter().map(|(_, sku)| sku.clone()).collect();
            self.pusher.create_skus(&skus).await?;
            for (key, sku) in &pending {
                ctx.store.set_fulfillment_link(key, &sku.sku_code).await?;
            }
        }
        Ok(products)
    }
}

#[async_trait]
impl ChannelStrategy for OmnifulStrategy {
    #[instrument(skip_all, fields(order = %ctx.order.name))]
    async fn after_import(&self, ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        if ctx.order.state == OrderState::Cancel {
            return Ok(());
        }

        let customer_id = self.sync_customer(ctx).await?;
        let products = self.sync_skus(ctx).await?;

        let key = FulfillmentKey::order(ctx.order.id);
        let linked = ctx.store.get_fulfillment_link(&key).await?;
        if linked.is_some() && !ctx.order.is_draft() {
            tracing::debug!("Order already confirmed in Omniful");
            return Ok(());
        }

        let payload = order_payload(
            ctx.order,
            ctx.feed,
            &customer_id,
            &products,
            &self.hub_code,
            linked.is_none(),
        )?;
        if linked.is_some() {
            self.pusher.update_order(&payload).await?;
        } else {
            let remote = self
                .pusher
                .create_order(&payload)
                .await?
                .unwrap_or_else(|| ctx.order.name.clone());
            ctx.store.set_fulfillment_link(&key, &remote).await?;
        }
        Ok(())
    }

    async fn on_cancelled(&self, ctx: &HookContext<'_>) -> Result<(), StrategyError> {
        let key = FulfillmentKey::order(ctx.order.id);
        if ctx.store.get_fulfillment_link(&key).await?.is_none() {
            return Ok(());
        }
        self.pusher.cancel_order(&ctx.order.name, CANCEL_REASON).await?;
        Ok(())
    }
}

//! Staged feed → internal sales order.
//!
//! An import walks a fixed sequence of stages:
//!
//! 1. partner: the feed must name a customer with a store ID
//! 2. lines: carrier, one product per line, taxes
//! 3. pricing: active currency and its pricelist
//! 4. save: rewrite the mapped order, or create a new one
//! 5. status: apply the store status slug, register a payment if mapped
//!
//! A stage that cannot continue stops the import with a message and leaves the
//! feed in `error` for a later retry. Only infrastructure failures surface as
//! [`ImportError`].

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use channel_sync_core::{
    CanonicalLine, ChannelId, FeedId, FeedState, LineSource, OrderFeed, OrderState, PartnerId,
    PricelistId, SaleOrderId, SyncStatus, TaxDescriptor, TaxId, sorted_rates,
};

use super::payment::register_payment;
use super::status_sync::{AppliedActions, sync_order_status};
use super::strategy::{HookContext, StrategyRegistry};
use super::tax_resolver::{TaxError, TaxResolver};
use crate::db::{RepositoryError, Store, require_sale_order};
use crate::models::{
    Carrier, Channel, FeedRecord, NewOrderMapping, NewPartner, NewProduct, NewSaleOrder,
    NewSyncLog, OrderMapping, Product, SaleOrder, SaleOrderLine, ServiceSlot, SyncAction,
    prepend_message,
};

/// Suffix for any failure while rewriting a mapped order.
const UPDATE_FAILED: &str = "<br/>Error while order update.";

/// Errors that stop an import without recording an outcome.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    #[error(transparent)]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Tax(#[from] TaxError),
}

/// Result of evaluating one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub feed_id: FeedId,
    /// `done` or `error`.
    pub state: FeedState,
    pub sale_order_id: Option<SaleOrderId>,
    /// Messages added by this evaluation.
    pub message: String,
    /// Whether a new sales order was created.
    pub created: bool,
}

/// A stage either stops the import with a message or fails outright.
enum StageError {
    Abort(String),
    Fatal(ImportError),
}

impl From<RepositoryError> for StageError {
    fn from(err: RepositoryError) -> Self {
        Self::Fatal(err.into())
    }
}

impl From<TaxError> for StageError {
    fn from(err: TaxError) -> Self {
        Self::Fatal(err.into())
    }
}

type Stage<T> = Result<T, StageError>;

/// The saved order and what happened to it.
struct Saved {
    order: SaleOrder,
    created: bool,
}

/// Imports staged order feeds into sales orders.
pub struct OrderImporter<S: Store> {
    store: Arc<S>,
    taxes: TaxResolver,
    strategies: StrategyRegistry,
}

impl<S: Store> Clone for OrderImporter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            taxes: self.taxes.clone(),
            strategies: self.strategies.clone(),
        }
    }
}

impl<S: Store> OrderImporter<S> {
    #[must_use]
    pub fn new(store: Arc<S>, strategies: StrategyRegistry) -> Self {
        Self {
            store,
            taxes: TaxResolver::new(),
            strategies,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub const fn tax_resolver(&self) -> &TaxResolver {
        &self.taxes
    }

    /// Stage `order` and import it right away.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the channel is unknown or storage fails.
    #[instrument(skip(self, order), fields(store_id = %order.store_id))]
    pub async fn import_feed(
        &self,
        channel_id: ChannelId,
        order: &OrderFeed,
    ) -> Result<ImportOutcome, ImportError> {
        let channel = self.channel(channel_id).await?;
        let feed = self.store.upsert_feed(channel_id, order).await?;
        self.evaluate(&channel, &feed).await
    }

    /// Re-run every feed of the channel that is not done.
    ///
    /// A feed that fails outright is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the channel is unknown or the feeds cannot be
    /// listed.
    #[instrument(skip(self))]
    pub async fn retry_feeds(&self, channel_id: ChannelId) -> Result<Vec<ImportOutcome>, ImportError> {
        let channel = self.channel(channel_id).await?;
        let feeds = self
            .store
            .list_feeds(
                channel_id,
                &[FeedState::Error, FeedState::Draft, FeedState::Update],
            )
            .await?;

        let mut outcomes = Vec::with_capacity(feeds.len());
        for feed in &feeds {
            match self.evaluate(&channel, feed).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(feed_id = %feed.id, error = %e, "Feed retry failed");
                }
            }
        }
        Ok(outcomes)
    }

    /// Import one staged feed and record the outcome on it.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` on storage failures outside the order update
    /// path. The feed is left as it was and can be retried.
    #[instrument(skip_all, fields(channel_id = %channel.id, feed_id = %feed.id, store_id = %feed.store_id()))]
    pub async fn evaluate(
        &self,
        channel: &Channel,
        feed: &FeedRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let order = &feed.order;
        let mut channel = channel.clone();
        let mut message = String::new();

        let mapping = self
            .store
            .find_order_mapping(channel.id, &order.store_id)
            .await?;

        let saved = match self
            .save_order(&mut channel, order, mapping.as_ref(), &mut message)
            .await
        {
            Ok(saved) => Some(saved),
            Err(StageError::Abort(reason)) => {
                message.push_str(&reason);
                None
            }
            Err(StageError::Fatal(e)) => return Err(e),
        };

        let Some(Saved { order: sale_order, created }) = saved else {
            tracing::warn!(message = %message, "Order import stopped");
            return self.finish(&channel, feed, None, message, false).await;
        };

        let applied = self
            .sync_status(&channel, order, &sale_order, &mut message)
            .await?;
        let sale_order = require_sale_order(self.store.as_ref(), sale_order.id).await?;

        let ctx = HookContext {
            store: self.store.as_ref(),
            channel: &channel,
            feed: order,
            order: &sale_order,
        };
        if let Some(failures) = self.strategies.run_hooks(&ctx, applied).await {
            message.push_str(&failures);
        }

        self.finish(&channel, feed, Some(sale_order.id), message, created)
            .await
    }

    async fn channel(&self, id: ChannelId) -> Result<Channel, ImportError> {
        self.store
            .get_channel(id)
            .await?
            .ok_or(ImportError::ChannelNotFound(id))
    }

    /// Close the feed: state, prepended message, sync log entry.
    async fn finish(
        &self,
        channel: &Channel,
        feed: &FeedRecord,
        sale_order_id: Option<SaleOrderId>,
        message: String,
        created: bool,
    ) -> Result<ImportOutcome, ImportError> {
        let (state, status) = if sale_order_id.is_some() {
            (FeedState::Done, SyncStatus::Success)
        } else {
            (FeedState::Error, SyncStatus::Error)
        };

        self.store
            .finish_feed(feed.id, state, &prepend_message(&message, &feed.message))
            .await?;
        self.store
            .insert_sync_log(&NewSyncLog {
                channel_id: channel.id,
                status,
                action_on: "order".to_string(),
                action_type: SyncAction::Import,
                store_id: feed.store_id().to_string(),
                sale_order_id,
                summary: message.clone(),
            })
            .await?;

        tracing::info!(state = %state, sale_order_id = ?sale_order_id, created, "Feed evaluated");
        Ok(ImportOutcome {
            feed_id: feed.id,
            state,
            sale_order_id,
            message,
            created,
        })
    }

    // =========================================================================
    // Stages
    // =========================================================================

    async fn save_order(
        &self,
        channel: &mut Channel,
        order: &OrderFeed,
        mapping: Option<&OrderMapping>,
        message: &mut String,
    ) -> Stage<Saved> {
        let existing = match mapping {
            Some(m) => self.store.get_sale_order(m.sale_order_id).await?,
            None => None,
        };

        let draft = match self.draft_order(channel, order, existing.as_ref()).await {
            Ok(draft) => draft,
            Err(StageError::Abort(reason)) if existing.is_some() => {
                return Err(StageError::Abort(format!("{reason}{UPDATE_FAILED}")));
            }
            Err(e) => return Err(e),
        };

        match (mapping, existing) {
            (Some(mapping), Some(existing)) => {
                let saved = self
                    .update_order(channel, order, mapping, existing, draft, message)
                    .await;
                match saved {
                    Ok(saved) => Ok(saved),
                    Err(StageError::Fatal(e)) => {
                        tracing::error!(error = %e, "Order update failed");
                        Err(StageError::Abort(UPDATE_FAILED.to_string()))
                    }
                    Err(abort) => Err(abort),
                }
            }
            _ => self.create_order(channel, order, draft, message).await,
        }
    }

    /// Partner, carrier, lines and pricelist for the order to save.
    async fn draft_order(
        &self,
        channel: &mut Channel,
        order: &OrderFeed,
        existing: Option<&SaleOrder>,
    ) -> Stage<NewSaleOrder> {
        let partner_id = self.resolve_partner(channel, order, existing).await?;
        let carrier = self.resolve_carrier(order).await?;
        let lines = self.build_lines(channel, order, carrier.as_ref()).await?;
        let pricelist_id = self.resolve_pricelist(order).await?;

        Ok(NewSaleOrder {
            name: order.name.clone(),
            channel_id: channel.id,
            partner_id,
            pricelist_id,
            carrier_id: carrier.map(|c| c.id),
            date_order: order.date_order,
            payment_method: order.payment_method.clone(),
            total_amount: order.total_amount,
            lines,
        })
    }

    async fn resolve_partner(
        &self,
        channel: &Channel,
        order: &OrderFeed,
        existing: Option<&SaleOrder>,
    ) -> Stage<PartnerId> {
        let customer = &order.customer;
        let store_partner_id = customer
            .store_id
            .as_deref()
            .filter(|id| !id.trim().is_empty());
        let Some(store_partner_id) = store_partner_id.filter(|_| !customer.name.trim().is_empty())
        else {
            return Err(StageError::Abort(
                "<br/>No partner in sale order data.".to_string(),
            ));
        };

        if let Some(existing) = existing {
            return Ok(existing.partner_id);
        }

        if let Some(partner) = self.store.find_partner(channel.id, store_partner_id).await? {
            return Ok(partner.id);
        }

        let address = &order.address;
        let partner = self
            .store
            .upsert_partner(&NewPartner {
                channel_id: channel.id,
                store_id: store_partner_id.to_string(),
                name: customer.name.clone(),
                email: customer.email.clone(),
                phone: customer.invoice_phone.clone(),
                street: address.street.clone(),
                street2: address.street2.clone(),
                zip: address.zip.clone(),
                city: address.city.clone(),
                country_code: address.country_code.clone(),
            })
            .await?;
        tracing::info!(partner_id = %partner.id, "Created partner from order");
        Ok(partner.id)
    }

    async fn resolve_carrier(&self, order: &OrderFeed) -> Stage<Option<Carrier>> {
        let Some(name) = order.carrier.as_deref().filter(|n| !n.trim().is_empty()) else {
            return Ok(None);
        };
        if let Some(carrier) = self.store.find_carrier(name).await? {
            return Ok(Some(carrier));
        }
        Ok(Some(self.store.create_carrier(name, None).await?))
    }

    async fn build_lines(
        &self,
        channel: &mut Channel,
        order: &OrderFeed,
        carrier: Option<&Carrier>,
    ) -> Stage<Vec<SaleOrderLine>> {
        let store = self.store.as_ref();

        let discount_tax_ids = match channel
            .tax_on_discount_line
            .then(|| uniform_product_taxes(&order.lines))
            .flatten()
        {
            Some(taxes) => Some(self.taxes.resolve(store, channel, taxes).await?),
            None => None,
        };

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = self
                .line_product(channel, line, carrier)
                .await?
                .ok_or_else(|| {
                    StageError::Abort(format!("No product found for order line {}", line.name))
                })?;

            let tax_ids = match &discount_tax_ids {
                Some(ids) if line.source != LineSource::Delivery => ids.clone(),
                _ => {
                    let resolved = self.taxes.resolve(store, channel, &line.taxes).await?;
                    line_taxes(resolved, &product)
                }
            };

            let price_unit = if line.source == LineSource::Discount {
                -line.unit_price
            } else {
                line.unit_price
            };

            lines.push(SaleOrderLine {
                name: line.name.clone(),
                product_id: product.id,
                price_unit,
                quantity: line.quantity,
                discount_percent: line.discount_percent,
                tax_ids,
                source: line.source,
            });
        }
        Ok(lines)
    }

    async fn line_product(
        &self,
        channel: &mut Channel,
        line: &CanonicalLine,
        carrier: Option<&Carrier>,
    ) -> Stage<Option<Product>> {
        match line.source {
            LineSource::Product => Ok(self.match_product(channel.id, line).await?),
            LineSource::Delivery => {
                if let Some(product_id) = carrier.and_then(|c| c.product_id)
                    && let Some(product) = self.store.get_product(product_id).await?
                {
                    return Ok(Some(product));
                }
                self.service_product(channel, ServiceSlot::Delivery).await.map(Some)
            }
            LineSource::Placeholder => {
                self.service_product(channel, ServiceSlot::Delivery).await.map(Some)
            }
            LineSource::Discount => {
                self.service_product(channel, ServiceSlot::Discount).await.map(Some)
            }
            LineSource::CashOnDelivery => {
                self.service_product(channel, ServiceSlot::CashOnDelivery)
                    .await
                    .map(Some)
            }
        }
    }

    /// Product mapping, then SKU, then barcode.
    async fn match_product(
        &self,
        channel_id: ChannelId,
        line: &CanonicalLine,
    ) -> Result<Option<Product>, RepositoryError> {
        if let Some(store_product_id) = line.product_ref.as_deref()
            && let Some(mapping) = self
                .store
                .find_product_mapping(channel_id, store_product_id, &line.variant)
                .await?
            && let Some(product) = self.store.get_product(mapping.product_id).await?
        {
            return Ok(Some(product));
        }

        if !line.sku.is_empty()
            && let Some(product) = self.store.find_product_by_code(&line.sku).await?
        {
            return Ok(Some(product));
        }

        match line.barcode.as_deref().filter(|b| !b.is_empty()) {
            Some(barcode) => self.store.find_product_by_barcode(barcode).await,
            None => Ok(None),
        }
    }

    /// The channel's product for `slot`, created on first use.
    async fn service_product(&self, channel: &mut Channel, slot: ServiceSlot) -> Stage<Product> {
        if let Some(product_id) = channel.service_product(slot)
            && let Some(product) = self.store.get_product(product_id).await?
        {
            return Ok(product);
        }

        let product = self
            .store
            .create_product(&NewProduct::service(slot.product_name()))
            .await?;
        self.store
            .set_service_product(channel.id, slot, product.id)
            .await?;
        channel.set_service_product(slot, product.id);
        tracing::info!(slot = slot.as_str(), product_id = %product.id, "Created service product");
        Ok(product)
    }

    async fn resolve_pricelist(&self, order: &OrderFeed) -> Stage<PricelistId> {
        let currency = self
            .store
            .find_currency(order.currency)
            .await?
            .filter(|c| c.active)
            .ok_or_else(|| {
                StageError::Abort(format!("<br/> Currency {} not active", order.currency))
            })?;

        if let Some(pricelist) = self.store.find_pricelist(currency.id).await? {
            return Ok(pricelist.id);
        }
        let pricelist = self
            .store
            .create_pricelist(&format!("{} Pricelist", currency.code), currency.id)
            .await?;
        Ok(pricelist.id)
    }

    async fn update_order(
        &self,
        channel: &Channel,
        order: &OrderFeed,
        mapping: &OrderMapping,
        existing: SaleOrder,
        mut draft: NewSaleOrder,
        message: &mut String,
    ) -> Stage<Saved> {
        let saved = if existing.is_draft() {
            if !channel.use_store_order_name {
                draft.name.clone_from(&existing.name);
            }
            let saved = self.store.rewrite_sale_order(existing.id, &draft).await?;
            message.push_str(&format!("<br/> Order {} successfully updated", saved.name));
            saved
        } else {
            self.store
                .update_order_total(existing.id, order.total_amount)
                .await?;
            message.push_str("Only draft orders can be updated. ");
            SaleOrder {
                total_amount: order.total_amount,
                ..existing
            }
        };

        self.store
            .update_mapping_status(mapping.id, &order.status_slug)
            .await?;
        Ok(Saved {
            order: saved,
            created: false,
        })
    }

    async fn create_order(
        &self,
        channel: &Channel,
        order: &OrderFeed,
        draft: NewSaleOrder,
        message: &mut String,
    ) -> Stage<Saved> {
        let (saved, created) = match self.store.find_sale_order_by_name(&draft.name).await? {
            Some(existing) => {
                tracing::info!(sale_order_id = %existing.id, "Reusing order with the same name");
                (existing, false)
            }
            None => (self.store.create_sale_order(&draft).await?, true),
        };

        message.push_str(&format!(
            "<br/> Order {} successfully evaluated",
            order.store_id
        ));

        let mapping = NewOrderMapping {
            channel_id: channel.id,
            store_order_id: order.store_id.clone(),
            sale_order_id: saved.id,
            store_source: order.store_source.clone(),
            store_status: order.status_slug.clone(),
        };
        match self.store.create_order_mapping(&mapping).await {
            Ok(_) => Ok(Saved {
                order: saved,
                created,
            }),
            // A concurrent delivery mapped this store order first.
            Err(RepositoryError::Conflict(_)) => {
                let winner = self
                    .store
                    .find_order_mapping(channel.id, &order.store_id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                tracing::warn!(
                    sale_order_id = %saved.id,
                    mapped_sale_order_id = %winner.sale_order_id,
                    "Store order already mapped, continuing with the mapped order"
                );
                Ok(Saved {
                    order: require_sale_order(self.store.as_ref(), winner.sale_order_id).await?,
                    created: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn sync_status(
        &self,
        channel: &Channel,
        order: &OrderFeed,
        sale_order: &SaleOrder,
        message: &mut String,
    ) -> Result<AppliedActions, ImportError> {
        if sale_order.state == OrderState::Cancel {
            return Ok(AppliedActions::default());
        }

        let store = self.store.as_ref();
        let sync = sync_order_status(store, channel.id, sale_order, &order.status_slug).await?;
        if let Some(note) = &sync.message {
            message.push_str(note);
        }

        if sync.mapping.as_ref().is_some_and(|m| m.make_payment) {
            register_payment(store, sale_order, order).await?;
        }
        Ok(sync.applied)
    }
}

/// Taxes for a line: the resolved set, or the product's own when none resolved.
fn line_taxes(resolved: Vec<TaxId>, product: &Product) -> Vec<TaxId> {
    if resolved.is_empty() {
        product.tax_ids.clone()
    } else {
        resolved
    }
}

/// The tax set every product line shares, when the order has an untaxed
/// discount line to carry it.
///
/// Returns `None` if there is no such discount line, no product lines, a
/// product line without taxes, or two product lines with different rates.
fn uniform_product_taxes(lines: &[CanonicalLine]) -> Option<&[TaxDescriptor]> {
    let has_untaxed_discount = lines
        .iter()
        .any(|l| l.source == LineSource::Discount && l.taxes.is_empty());
    if !has_untaxed_discount {
        return None;
    }

    let mut products = lines.iter().filter(|l| l.is_product());
    let first = products.next()?;
    if first.taxes.is_empty() {
        return None;
    }
    let rates = sorted_rates(&first.taxes);
    products
        .all(|l| !l.taxes.is_empty() && sorted_rates(&l.taxes) == rates)
        .then_some(first.taxes.as_slice())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{ChannelOrderState, ProductMapping};
    use channel_sync_core::{
        AddressInfo, ChannelKind, CurrencyCode, CustomerInfo, DefaultTaxType, InvoiceState,
        NO_VARIANTS,
    };
    use rust_decimal::Decimal;

    const CHANNEL: ChannelId = ChannelId::new(1);

    fn channel() -> Channel {
        Channel {
            id: CHANNEL,
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

    fn item(name: &str, sku: &str, price: i64, vat: Option<i64>) -> CanonicalLine {
        CanonicalLine {
            name: name.to_string(),
            product_ref: Some(format!("p-{sku}")),
            variant: NO_VARIANTS.to_string(),
            sku: sku.to_string(),
            barcode: None,
            unit_price: Decimal::from(price),
            quantity: Decimal::ONE,
            taxes: vat
                .map(|rate| vec![TaxDescriptor::percent(Decimal::from(rate))])
                .unwrap_or_default(),
            discount_percent: Decimal::ZERO,
            source: LineSource::Product,
        }
    }

    fn feed(lines: Vec<CanonicalLine>) -> OrderFeed {
        OrderFeed {
            store_id: "55".to_string(),
            name: "1001".to_string(),
            store_source: "webhook".to_string(),
            currency: CurrencyCode::SAR,
            date_order: None,
            status_slug: "under_review".to_string(),
            payment_method: "mada".to_string(),
            carrier: Some("Aramex".to_string()),
            customer: CustomerInfo {
                store_id: Some("c-9".to_string()),
                name: "Sara Ali".to_string(),
                email: Some("sara@example.com".to_string()),
                mobile: Some("500000000".to_string()),
                invoice_phone: "966500000000".to_string(),
            },
            address: AddressInfo {
                street: "12".to_string(),
                street2: "King Fahd Rd".to_string(),
                zip: "12345".to_string(),
                city: "Riyadh".to_string(),
                country_code: "SA".to_string(),
            },
            lines,
            total_amount: Decimal::from(115),
        }
    }

    async fn setup(channel: Channel) -> (Arc<MemoryStore>, OrderImporter<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.insert_channel(channel).await;
        store.insert_currency(CurrencyCode::SAR, true).await;
        store
            .create_product(&NewProduct {
                name: "Mug".to_string(),
                default_code: Some("MUG-1".to_string()),
                list_price: Decimal::from(100),
                ..NewProduct::default()
            })
            .await
            .unwrap();
        let importer = OrderImporter::new(Arc::clone(&store), StrategyRegistry::new());
        (store, importer)
    }

    #[tokio::test]
    async fn test_creates_order_with_service_lines() {
        let (store, importer) = setup(channel()).await;
        let lines = vec![
            item("Mug", "MUG-1", 100, Some(15)),
            CanonicalLine::synthetic("Shipping", Decimal::from(20), LineSource::Delivery),
            CanonicalLine::synthetic("Discount: SALE", Decimal::from(5), LineSource::Discount),
        ];

        let outcome = importer.import_feed(CHANNEL, &feed(lines)).await.unwrap();
        assert_eq!(outcome.state, FeedState::Done);
        assert!(outcome.created);
        assert_eq!(outcome.message, "<br/> Order 55 successfully evaluated<br/> No status mapping for under_review");

        let order = store.get_sale_order(outcome.sale_order_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(order.name, "1001");
        assert_eq!(order.lines.len(), 3);
        assert_eq!(order.lines[0].tax_ids.len(), 1);
        assert_eq!(order.lines[2].price_unit, Decimal::from(-5));
        assert!(order.lines[1].tax_ids.is_empty());

        let channel = store.get_channel(CHANNEL).await.unwrap().unwrap();
        assert_eq!(channel.delivery_product_id, Some(order.lines[1].product_id));
        assert_eq!(channel.discount_product_id, Some(order.lines[2].product_id));

        let mappings = store.order_mappings().await;
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].store_status, "under_review");
        assert_eq!(store.carriers().await[0].name, "Aramex");
        assert_eq!(store.partners().await[0].store_id, "c-9");
        assert_eq!(store.sync_logs().await[0].status, SyncStatus::Success);
    }

    #[tokio::test]
    async fn test_missing_partner_marks_feed_error() {
        let (store, importer) = setup(channel()).await;
        let mut order = feed(vec![item("Mug", "MUG-1", 100, None)]);
        order.customer.store_id = None;

        let outcome = importer.import_feed(CHANNEL, &order).await.unwrap();
        assert_eq!(outcome.state, FeedState::Error);
        assert_eq!(outcome.message, "<br/>No partner in sale order data.");
        assert!(store.sale_orders().await.is_empty());

        let feeds = store.feeds().await;
        assert_eq!(feeds[0].state, FeedState::Error);
        assert_eq!(feeds[0].message, "<br/>No partner in sale order data. <br/> ");
        assert_eq!(store.sync_logs().await[0].status, SyncStatus::Error);
    }

    #[tokio::test]
    async fn test_unknown_product_then_retry() {
        let (store, importer) = setup(channel()).await;
        let order = feed(vec![item("Lamp", "LAMP-1", 40, None)]);

        let outcome = importer.import_feed(CHANNEL, &order).await.unwrap();
        assert_eq!(outcome.state, FeedState::Error);
        assert_eq!(outcome.message, "No product found for order line Lamp");

        let lamp = store
            .create_product(&NewProduct {
                name: "Lamp".to_string(),
                ..NewProduct::default()
            })
            .await
            .unwrap();
        store
            .upsert_product_mapping(&ProductMapping {
                channel_id: CHANNEL,
                store_product_id: "p-LAMP-1".to_string(),
                store_variant_id: NO_VARIANTS.to_string(),
                product_id: lamp.id,
                default_code: None,
                barcode: None,
            })
            .await
            .unwrap();

        let retried = importer.retry_feeds(CHANNEL).await.unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].state, FeedState::Done);
        let order = store.sale_orders().await.remove(0);
        assert_eq!(order.lines[0].product_id, lamp.id);

        let feed = store.feeds().await.remove(0);
        assert!(feed.message.ends_with("No product found for order line Lamp <br/> "));
        assert!(importer.retry_feeds(CHANNEL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_currency() {
        let (store, importer) = setup(channel()).await;
        store.insert_currency(CurrencyCode::parse("USD").unwrap(), false).await;
        let mut order = feed(vec![item("Mug", "MUG-1", 100, None)]);
        order.currency = CurrencyCode::parse("USD").unwrap();

        let outcome = importer.import_feed(CHANNEL, &order).await.unwrap();
        assert_eq!(outcome.state, FeedState::Error);
        assert_eq!(outcome.message, "<br/> Currency USD not active");
    }

    #[tokio::test]
    async fn test_reimport_rewrites_draft_only() {
        let (store, importer) = setup(channel()).await;
        let first = importer
            .import_feed(CHANNEL, &feed(vec![item("Mug", "MUG-1", 100, None)]))
            .await
            .unwrap();
        let id = first.sale_order_id.unwrap();

        let mut changed = feed(vec![
            item("Mug", "MUG-1", 100, None),
            item("Mug", "MUG-1", 100, None),
        ]);
        changed.name = "R-1001".to_string();
        changed.total_amount = Decimal::from(230);
        let second = importer.import_feed(CHANNEL, &changed).await.unwrap();
        assert_eq!(second.sale_order_id, Some(id));
        assert!(!second.created);
        assert!(second.message.starts_with("<br/> Order 1001 successfully updated"));

        let order = store.get_sale_order(id).await.unwrap().unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.name, "1001");

        let mut confirm = ChannelOrderState::new(CHANNEL, "in_progress");
        confirm.confirm = true;
        store.insert_order_state(confirm).await;
        changed.status_slug = "in_progress".to_string();
        importer.import_feed(CHANNEL, &changed).await.unwrap();

        changed.total_amount = Decimal::from(999);
        changed.lines.truncate(1);
        let locked = importer.import_feed(CHANNEL, &changed).await.unwrap();
        assert!(locked.message.starts_with("Only draft orders can be updated. "));
        let order = store.get_sale_order(id).await.unwrap().unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total_amount, Decimal::from(999));
        assert_eq!(store.order_mappings().await[0].store_status, "in_progress");
    }

    #[tokio::test]
    async fn test_failed_update_of_mapped_order_is_flagged() {
        let (store, importer) = setup(channel()).await;
        let first = importer
            .import_feed(CHANNEL, &feed(vec![item("Mug", "MUG-1", 100, None)]))
            .await
            .unwrap();

        let lamp = feed(vec![item("Lamp", "LAMP-1", 40, None)]);
        let outcome = importer.import_feed(CHANNEL, &lamp).await.unwrap();
        assert_eq!(outcome.state, FeedState::Error);
        assert_eq!(
            outcome.message,
            "No product found for order line Lamp<br/>Error while order update."
        );

        let order = store.get_sale_order(first.sale_order_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(order.lines[0].name, "Mug");

        let mut no_partner = feed(vec![item("Mug", "MUG-1", 100, None)]);
        no_partner.customer.store_id = None;
        let outcome = importer.import_feed(CHANNEL, &no_partner).await.unwrap();
        assert!(outcome.message.ends_with("<br/>Error while order update."));
    }

    #[tokio::test]
    async fn test_mapping_race_continues_with_mapped_order() {
        let (store, importer) = setup(channel()).await;
        let first = importer
            .import_feed(CHANNEL, &feed(vec![item("Mug", "MUG-1", 100, None)]))
            .await
            .unwrap();
        let mapped_id = first.sale_order_id.unwrap();

        let mut order = feed(vec![item("Mug", "MUG-1", 100, None)]);
        order.name = "1002".to_string();
        let mut channel = store.get_channel(CHANNEL).await.unwrap().unwrap();
        let draft = importer.draft_order(&mut channel, &order, None).await.ok().unwrap();

        let mut message = String::new();
        let saved = importer
            .create_order(&channel, &order, draft, &mut message)
            .await
            .ok()
            .unwrap();
        assert_eq!(saved.order.id, mapped_id);
        assert!(!saved.created);
        assert_eq!(store.order_mappings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_store_order_name_kept_on_update() {
        let (store, importer) = setup(Channel {
            use_store_order_name: true,
            ..channel()
        })
        .await;
        let mut order = feed(vec![item("Mug", "MUG-1", 100, None)]);
        let id = importer.import_feed(CHANNEL, &order).await.unwrap().sale_order_id.unwrap();

        order.name = "R-1001".to_string();
        importer.import_feed(CHANNEL, &order).await.unwrap();
        assert_eq!(store.get_sale_order(id).await.unwrap().unwrap().name, "R-1001");
    }

    #[tokio::test]
    async fn test_paid_status_registers_payment() {
        let (store, importer) = setup(channel()).await;
        let mut completed = ChannelOrderState::new(CHANNEL, "completed");
        completed.invoice_paid = true;
        completed.make_payment = true;
        store.insert_order_state(completed).await;

        let mut order = feed(vec![item("Mug", "MUG-1", 100, Some(15))]);
        order.status_slug = "completed".to_string();
        let outcome = importer.import_feed(CHANNEL, &order).await.unwrap();
        assert_eq!(outcome.state, FeedState::Done);

        let saved = store.get_sale_order(outcome.sale_order_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(saved.state, OrderState::Sale);
        assert_eq!(saved.invoice_state, InvoiceState::Paid);

        let payments = store.payments().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, Decimal::from(115));

        importer.import_feed(CHANNEL, &order).await.unwrap();
        assert_eq!(store.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_order_name_is_reused() {
        let (store, importer) = setup(channel()).await;
        let first = importer
            .import_feed(CHANNEL, &feed(vec![item("Mug", "MUG-1", 100, None)]))
            .await
            .unwrap();

        let mut duplicate = feed(vec![item("Mug", "MUG-1", 100, None)]);
        duplicate.store_id = "56".to_string();
        let second = importer.import_feed(CHANNEL, &duplicate).await.unwrap();
        assert_eq!(second.sale_order_id, first.sale_order_id);
        assert!(!second.created);
        assert_eq!(store.sale_orders().await.len(), 1);
    }

    #[tokio::test]
    async fn test_discount_line_takes_uniform_product_taxes() {
        let (store, importer) = setup(Channel {
            tax_on_discount_line: true,
            ..channel()
        })
        .await;
        let lines = vec![
            item("Mug", "MUG-1", 100, Some(15)),
            item("Mug", "MUG-1", 50, Some(15)),
            CanonicalLine::synthetic("Shipping", Decimal::from(20), LineSource::Delivery),
            CanonicalLine::synthetic("Discount: SALE", Decimal::from(5), LineSource::Discount),
        ];
        let outcome = importer.import_feed(CHANNEL, &feed(lines)).await.unwrap();
        let order = store.get_sale_order(outcome.sale_order_id.unwrap()).await.unwrap().unwrap();

        let vat = order.lines[0].tax_ids.clone();
        assert_eq!(vat.len(), 1);
        assert_eq!(order.lines[3].tax_ids, vat);
        assert!(order.lines[2].tax_ids.is_empty());
    }

    #[test]
    fn test_uniform_taxes_need_matching_rates() {
        let discount = CanonicalLine::synthetic("Discount", Decimal::ONE, LineSource::Discount);
        let same = [
            item("A", "A", 1, Some(15)),
            item("B", "B", 1, Some(15)),
            discount.clone(),
        ];
        assert!(uniform_product_taxes(&same).is_some());

        let mixed = [
            item("A", "A", 1, Some(15)),
            item("B", "B", 1, Some(5)),
            discount.clone(),
        ];
        assert!(uniform_product_taxes(&mixed).is_none());

        let untaxed = [item("A", "A", 1, None), discount];
        assert!(uniform_product_taxes(&untaxed).is_none());

        let no_discount = [item("A", "A", 1, Some(15))];
        assert!(uniform_product_taxes(&no_discount).is_none());
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let store = Arc::new(MemoryStore::new());
        let importer = OrderImporter::new(store, StrategyRegistry::new());
        let result = importer.import_feed(ChannelId::new(42), &feed(vec![])).await;
        assert!(matches!(result, Err(ImportError::ChannelNotFound(_))));
    }
}

//! In-process implementation of [`Store`].
//!
//! Backs tests and `--dry-run` imports. All state lives behind one
//! `tokio::sync::RwLock`, so every trait call is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use channel_sync_core::{
    CarrierId, ChannelId, CurrencyCode, CurrencyId, FeedId, FeedState, InvoiceState, OrderFeed,
    OrderMappingId, OrderState, PaymentId, PricelistId, ProductId, SaleOrderId, SyncLogId, TaxId,
    PartnerId,
};

use super::{RepositoryError, Store};
use crate::models::{
    Carrier, Channel, ChannelOrderState, Currency, FeedRecord, FulfillmentKey, NewOrderMapping,
    NewPartner, NewPayment, NewProduct, NewSaleOrder, NewSyncLog, NewTax, OrderMapping,
    OrderStateUpdate, Partner, Payment, Pricelist, Product, ProductMapping, SaleOrder, ServiceSlot,
    StoreStatus, SyncLogEntry, Tax, TaxKey, TaxQuery,
};

#[derive(Default)]
struct Inner {
    next_id: i32,
    channels: HashMap<ChannelId, Channel>,
    order_states: HashMap<(ChannelId, String), ChannelOrderState>,
    taxes: Vec<Tax>,
    tax_mappings: HashMap<TaxKey, TaxId>,
    partners: Vec<Partner>,
    products: Vec<Product>,
    product_mappings: Vec<ProductMapping>,
    carriers: Vec<Carrier>,
    currencies: Vec<Currency>,
    pricelists: Vec<Pricelist>,
    sale_orders: Vec<SaleOrder>,
    order_mappings: Vec<OrderMapping>,
    payments: Vec<Payment>,
    feeds: Vec<FeedRecord>,
    sync_logs: Vec<SyncLogEntry>,
    store_statuses: Vec<StoreStatus>,
    fulfillment_links: HashMap<FulfillmentKey, String>,
}

impl Inner {
    const fn next(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn sale_order_mut(&mut self, id: SaleOrderId) -> Result<&mut SaleOrder, RepositoryError> {
        self.sale_orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// Store that keeps every record in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Insert or replace a channel.
    pub async fn insert_channel(&self, channel: Channel) {
        self.inner.write().await.channels.insert(channel.id, channel);
    }

    /// Insert or replace a status mapping.
    pub async fn insert_order_state(&self, state: ChannelOrderState) {
        self.inner
            .write()
            .await
            .order_states
            .insert((state.channel_id, state.store_slug.clone()), state);
    }

    /// Insert a currency and return it.
    pub async fn insert_currency(&self, code: CurrencyCode, active: bool) -> Currency {
        let mut inner = self.inner.write().await;
        let currency = Currency {
            id: CurrencyId::new(inner.next()),
            code,
            active,
        };
        inner.currencies.push(currency.clone());
        currency
    }

    /// Insert an existing tax and return it.
    pub async fn insert_tax(&self, tax: NewTax) -> Tax {
        self.create_tax(&tax)
            .await
            .unwrap_or_else(|_| unreachable!("memory inserts cannot fail"))
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub async fn taxes(&self) -> Vec<Tax> {
        self.inner.read().await.taxes.clone()
    }

    pub async fn partners(&self) -> Vec<Partner> {
        self.inner.read().await.partners.clone()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.inner.read().await.products.clone()
    }

    pub async fn sale_orders(&self) -> Vec<SaleOrder> {
        self.inner.read().await.sale_orders.clone()
    }

    pub async fn order_mappings(&self) -> Vec<OrderMapping> {
        self.inner.read().await.order_mappings.clone()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.inner.read().await.payments.clone()
    }

    pub async fn feeds(&self) -> Vec<FeedRecord> {
        self.inner.read().await.feeds.clone()
    }

    pub async fn sync_logs(&self) -> Vec<SyncLogEntry> {
        self.inner.read().await.sync_logs.clone()
    }

    pub async fn store_statuses(&self) -> Vec<StoreStatus> {
        self.inner.read().await.store_statuses.clone()
    }

    pub async fn carriers(&self) -> Vec<Carrier> {
        self.inner.read().await.carriers.clone()
    }

    pub async fn pricelists(&self) -> Vec<Pricelist> {
        self.inner.read().await.pricelists.clone()
    }

    pub async fn fulfillment_links(&self) -> HashMap<FulfillmentKey, String> {
        self.inner.read().await.fulfillment_links.clone()
    }
}

fn product_from(id: ProductId, product: &NewProduct) -> Product {
    Product {
        id,
        name: product.name.clone(),
        default_code: product.default_code.clone(),
        barcode: product.barcode.clone(),
        list_price: product.list_price,
        is_service: product.is_service,
        tax_ids: product.tax_ids.clone(),
    }
}

fn partner_from(id: PartnerId, partner: &NewPartner) -> Partner {
    Partner {
        id,
        channel_id: partner.channel_id,
        store_id: partner.store_id.clone(),
        name: partner.name.clone(),
        email: partner.email.clone(),
        phone: partner.phone.clone(),
        street: partner.street.clone(),
        street2: partner.street2.clone(),
        zip: partner.zip.clone(),
        city: partner.city.clone(),
        country_code: partner.country_code.clone(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn get_channel(&self, id: ChannelId) -> Result<Option<Channel>, RepositoryError> {
        Ok(self.inner.read().await.channels.get(&id).cloned())
    }

    async fn set_service_product(
        &self,
        channel_id: ChannelId,
        slot: ServiceSlot,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let channel = inner
            .channels
            .get_mut(&channel_id)
            .ok_or(RepositoryError::NotFound)?;
        channel.set_service_product(slot, product_id);
        Ok(())
    }

    async fn get_order_state(
        &self,
        channel_id: ChannelId,
        slug: &str,
    ) -> Result<Option<ChannelOrderState>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .order_states
            .get(&(channel_id, slug.to_string()))
            .cloned())
    }

    async fn find_tax_mapping(&self, key: &TaxKey) -> Result<Option<TaxId>, RepositoryError> {
        Ok(self.inner.read().await.tax_mappings.get(key).copied())
    }

    async fn find_tax(&self, query: &TaxQuery) -> Result<Option<TaxId>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .taxes
            .iter()
            .find(|tax| query.matches(tax))
            .map(|tax| tax.id))
    }

    async fn create_tax(&self, tax: &NewTax) -> Result<Tax, RepositoryError> {
        let mut inner = self.inner.write().await;
        let created = Tax {
            id: TaxId::new(inner.next()),
            name: tax.name.clone(),
            amount: tax.amount.normalize(),
            amount_type: tax.amount_type,
            price_include: tax.price_include,
        };
        inner.taxes.push(created.clone());
        Ok(created)
    }

    async fn create_tax_mapping(&self, key: &TaxKey, tax_id: TaxId) -> Result<TaxId, RepositoryError> {
        Ok(*self
            .inner
            .write()
            .await
            .tax_mappings
            .entry(*key)
            .or_insert(tax_id))
    }

    async fn get_partner(&self, id: PartnerId) -> Result<Option<Partner>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .partners
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_partner(
        &self,
        channel_id: ChannelId,
        store_id: &str,
    ) -> Result<Option<Partner>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .partners
            .iter()
            .find(|p| p.channel_id == channel_id && p.store_id == store_id)
            .cloned())
    }

    async fn upsert_partner(&self, partner: &NewPartner) -> Result<Partner, RepositoryError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner
            .partners
            .iter_mut()
            .find(|p| p.channel_id == partner.channel_id && p.store_id == partner.store_id)
        {
            *existing = partner_from(existing.id, partner);
            return Ok(existing.clone());
        }
        let created = partner_from(PartnerId::new(inner.next()), partner);
        inner.partners.push(created.clone());
        Ok(created)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.write().await;
        let created = product_from(ProductId::new(inner.next()), product);
        inner.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = product_from(id, product);
        Ok(existing.clone())
    }

    async fn find_product_mapping(
        &self,
        channel_id: ChannelId,
        store_product_id: &str,
        store_variant_id: &str,
    ) -> Result<Option<ProductMapping>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .product_mappings
            .iter()
            .find(|m| {
                m.channel_id == channel_id
                    && m.store_product_id == store_product_id
                    && m.store_variant_id == store_variant_id
            })
            .cloned())
    }

    async fn find_product_by_code(&self, code: &str) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .products
            .iter()
            .find(|p| p.default_code.as_deref() == Some(code))
            .cloned())
    }

    async fn find_product_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .products
            .iter()
            .find(|p| p.barcode.as_deref() == Some(barcode))
            .cloned())
    }

    async fn upsert_product_mapping(&self, mapping: &ProductMapping) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.product_mappings.retain(|m| {
            !(m.channel_id == mapping.channel_id
                && m.store_product_id == mapping.store_product_id
                && m.store_variant_id == mapping.store_variant_id)
        });
        inner.product_mappings.push(mapping.clone());
        Ok(())
    }

    async fn find_carrier(&self, name: &str) -> Result<Option<Carrier>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .carriers
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn create_carrier(
        &self,
        name: &str,
        product_id: Option<ProductId>,
    ) -> Result<Carrier, RepositoryError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.carriers.iter().find(|c| c.name == name) {
            return Ok(existing.clone());
        }
        let created = Carrier {
            id: CarrierId::new(inner.next()),
            name: name.to_string(),
            product_id,
        };
        inner.carriers.push(created.clone());
        Ok(created)
    }

    async fn find_currency(&self, code: CurrencyCode) -> Result<Option<Currency>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .currencies
            .iter()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn find_pricelist(
        &self,
        currency_id: CurrencyId,
    ) -> Result<Option<Pricelist>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .pricelists
            .iter()
            .find(|p| p.currency_id == currency_id)
            .cloned())
    }

    async fn create_pricelist(
        &self,
        name: &str,
        currency_id: CurrencyId,
    ) -> Result<Pricelist, RepositoryError> {
        let mut inner = self.inner.write().await;
        let created = Pricelist {
            id: PricelistId::new(inner.next()),
            name: name.to_string(),
            currency_id,
        };
        inner.pricelists.push(created.clone());
        Ok(created)
    }

    async fn get_sale_order(&self, id: SaleOrderId) -> Result<Option<SaleOrder>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .sale_orders
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn find_sale_order_by_name(
        &self,
        name: &str,
    ) -> Result<Option<SaleOrder>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .sale_orders
            .iter()
            .find(|o| o.name == name)
            .cloned())
    }

    async fn create_sale_order(&self, order: &NewSaleOrder) -> Result<SaleOrder, RepositoryError> {
        let mut inner = self.inner.write().await;
        let created = SaleOrder {
            id: SaleOrderId::new(inner.next()),
            name: order.name.clone(),
            channel_id: order.channel_id,
            partner_id: order.partner_id,
            pricelist_id: order.pricelist_id,
            carrier_id: order.carrier_id,
            date_order: order.date_order,
            payment_method: order.payment_method.clone(),
            state: OrderState::Draft,
            invoice_state: InvoiceState::None,
            shipped: false,
            total_amount: order.total_amount,
            lines: order.lines.clone(),
        };
        inner.sale_orders.push(created.clone());
        Ok(created)
    }

    async fn rewrite_sale_order(
        &self,
        id: SaleOrderId,
        order: &NewSaleOrder,
    ) -> Result<SaleOrder, RepositoryError> {
        let mut inner = self.inner.write().await;
        let existing = inner.sale_order_mut(id)?;
        existing.name.clone_from(&order.name);
        existing.partner_id = order.partner_id;
        existing.pricelist_id = order.pricelist_id;
        existing.carrier_id = order.carrier_id;
        existing.date_order = order.date_order;
        existing.payment_method.clone_from(&order.payment_method);
        existing.total_amount = order.total_amount;
        existing.lines.clone_from(&order.lines);
        Ok(existing.clone())
    }

    async fn update_order_total(
        &self,
        id: SaleOrderId,
        total: Decimal,
    ) -> Result<(), RepositoryError> {
        self.inner.write().await.sale_order_mut(id)?.total_amount = total;
        Ok(())
    }

    async fn update_order_state(
        &self,
        id: SaleOrderId,
        update: OrderStateUpdate,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let order = inner.sale_order_mut(id)?;
        order.state = update.state;
        order.invoice_state = update.invoice_state;
        order.shipped = update.shipped;
        Ok(())
    }

    async fn find_order_mapping(
        &self,
        channel_id: ChannelId,
        store_order_id: &str,
    ) -> Result<Option<OrderMapping>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .order_mappings
            .iter()
            .find(|m| m.channel_id == channel_id && m.store_order_id == store_order_id)
            .cloned())
    }

    async fn create_order_mapping(
        &self,
        mapping: &NewOrderMapping,
    ) -> Result<OrderMapping, RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner
            .order_mappings
            .iter()
            .any(|m| m.channel_id == mapping.channel_id && m.store_order_id == mapping.store_order_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "store order {} is already mapped",
                mapping.store_order_id
            )));
        }
        let created = OrderMapping {
            id: OrderMappingId::new(inner.next()),
            channel_id: mapping.channel_id,
            store_order_id: mapping.store_order_id.clone(),
            sale_order_id: mapping.sale_order_id,
            store_source: mapping.store_source.clone(),
            store_status: mapping.store_status.clone(),
        };
        inner.order_mappings.push(created.clone());
        Ok(created)
    }

    async fn update_mapping_status(
        &self,
        id: OrderMappingId,
        store_status: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        if let Some(mapping) = inner.order_mappings.iter_mut().find(|m| m.id == id) {
            store_status.clone_into(&mut mapping.store_status);
        }
        Ok(())
    }

    async fn find_payment_by_memo(&self, memo: &str) -> Result<Option<Payment>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .payments
            .iter()
            .find(|p| p.memo == memo)
            .cloned())
    }

    async fn create_payment(&self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.payments.iter().any(|p| p.memo == payment.memo) {
            return Err(RepositoryError::Conflict(format!(
                "payment {} already exists",
                payment.memo
            )));
        }
        let created = Payment {
            id: PaymentId::new(inner.next()),
            sale_order_id: payment.sale_order_id,
            memo: payment.memo.clone(),
            amount: payment.amount,
            journal: payment.journal.clone(),
            paid_at: payment.paid_at,
        };
        inner.payments.push(created.clone());
        Ok(created)
    }

    async fn upsert_feed(
        &self,
        channel_id: ChannelId,
        order: &OrderFeed,
    ) -> Result<FeedRecord, RepositoryError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner
            .feeds
            .iter_mut()
            .find(|f| f.channel_id == channel_id && f.order.store_id == order.store_id)
        {
            existing.order = order.clone();
            existing.state = FeedState::Update;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let created = FeedRecord {
            id: FeedId::new(inner.next()),
            channel_id,
            state: FeedState::Draft,
            message: String::new(),
            order: order.clone(),
            updated_at: Utc::now(),
        };
        inner.feeds.push(created.clone());
        Ok(created)
    }

    async fn get_feed(&self, id: FeedId) -> Result<Option<FeedRecord>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .feeds
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }

    async fn finish_feed(
        &self,
        id: FeedId,
        state: FeedState,
        message: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let feed = inner
            .feeds
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(RepositoryError::NotFound)?;
        feed.state = state;
        message.clone_into(&mut feed.message);
        feed.updated_at = Utc::now();
        Ok(())
    }

    async fn list_feeds(
        &self,
        channel_id: ChannelId,
        states: &[FeedState],
    ) -> Result<Vec<FeedRecord>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .feeds
            .iter()
            .filter(|f| f.channel_id == channel_id && states.contains(&f.state))
            .cloned()
            .collect())
    }

    async fn insert_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry, RepositoryError> {
        let mut inner = self.inner.write().await;
        let created = SyncLogEntry {
            id: SyncLogId::new(inner.next()),
            channel_id: entry.channel_id,
            status: entry.status,
            action_on: entry.action_on.clone(),
            action_type: entry.action_type,
            store_id: entry.store_id.clone(),
            sale_order_id: entry.sale_order_id,
            summary: entry.summary.clone(),
            created_at: Utc::now(),
        };
        inner.sync_logs.push(created.clone());
        Ok(created)
    }

    async fn upsert_store_status(&self, status: &StoreStatus) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.store_statuses.iter_mut().find(|s| {
            s.channel_id == status.channel_id && s.store_status_id == status.store_status_id
        }) {
            let parent = existing.parent_store_id;
            *existing = status.clone();
            existing.parent_store_id = parent;
        } else {
            let mut created = status.clone();
            created.parent_store_id = None;
            inner.store_statuses.push(created);
        }
        Ok(())
    }

    async fn set_store_status_parent(
        &self,
        channel_id: ChannelId,
        store_status_id: i64,
        parent_store_id: Option<i64>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        if let Some(status) = inner
            .store_statuses
            .iter_mut()
            .find(|s| s.channel_id == channel_id && s.store_status_id == store_status_id)
        {
            status.parent_store_id = parent_store_id;
        }
        Ok(())
    }

    async fn get_fulfillment_link(
        &self,
        key: &FulfillmentKey,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self.inner.read().await.fulfillment_links.get(key).cloned())
    }

    async fn set_fulfillment_link(
        &self,
        key: &FulfillmentKey,
        remote_id: &str,
    ) -> Result<(), RepositoryError> {
        self.inner
            .write()
            .await
            .fulfillment_links
            .insert(*key, remote_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use channel_sync_core::{FeedState, TaxAmountType};

    fn order(store_id: &str) -> OrderFeed {
        OrderFeed {
            store_id: store_id.to_string(),
            name: store_id.to_string(),
            store_source: "webhook".to_string(),
            currency: CurrencyCode::SAR,
            date_order: None,
            status_slug: "pending".to_string(),
            payment_method: "cod".to_string(),
            carrier: None,
            customer: channel_sync_core::CustomerInfo::default(),
            address: channel_sync_core::AddressInfo::default(),
            lines: vec![],
            total_amount: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn test_feed_upsert_moves_to_update() {
        let store = MemoryStore::new();
        let first = store.upsert_feed(ChannelId::new(1), &order("55")).await.unwrap();
        assert_eq!(first.state, FeedState::Draft);

        store
            .finish_feed(first.id, FeedState::Error, "boom")
            .await
            .unwrap();
        let second = store.upsert_feed(ChannelId::new(1), &order("55")).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.state, FeedState::Update);
        assert_eq!(second.message, "boom");
        assert_eq!(store.feeds().await.len(), 1);
    }

    #[tokio::test]
    async fn test_tax_mapping_keeps_first_writer() {
        let store = MemoryStore::new();
        let key = TaxKey::new(ChannelId::new(1), Decimal::from(15), TaxAmountType::Percent, true);
        assert_eq!(
            store.create_tax_mapping(&key, TaxId::new(4)).await.unwrap(),
            TaxId::new(4)
        );
        assert_eq!(
            store.create_tax_mapping(&key, TaxId::new(9)).await.unwrap(),
            TaxId::new(4)
        );
    }

    #[tokio::test]
    async fn test_payment_memo_is_unique() {
        let store = MemoryStore::new();
        let payment = NewPayment {
            sale_order_id: SaleOrderId::new(1),
            memo: "1001".to_string(),
            amount: Decimal::from(10),
            journal: "cod".to_string(),
            paid_at: Utc::now(),
        };
        store.create_payment(&payment).await.unwrap();
        assert!(matches!(
            store.create_payment(&payment).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_store_status_upsert_preserves_parent() {
        let store = MemoryStore::new();
        let status = StoreStatus {
            channel_id: ChannelId::new(1),
            store_status_id: 10,
            name: "Shipped".to_string(),
            slug: "shipped".to_string(),
            status_type: "original".to_string(),
            sort: 1,
            active: true,
            parent_store_id: None,
        };
        store.upsert_store_status(&status).await.unwrap();
        store
            .set_store_status_parent(ChannelId::new(1), 10, Some(3))
            .await
            .unwrap();

        let renamed = StoreStatus {
            name: "Out for delivery".to_string(),
            ..status
        };
        store.upsert_store_status(&renamed).await.unwrap();

        let statuses = store.store_statuses().await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].name, "Out for delivery");
        assert_eq!(statuses[0].parent_store_id, Some(3));
    }
}

//! `PostgreSQL` implementation of [`Store`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use channel_sync_core::{
    ChannelId, CurrencyCode, CurrencyId, FeedId, FeedState, OrderFeed, OrderMappingId, PartnerId,
    ProductId, SaleOrderId, TaxId,
};

use super::catalog::CatalogRepository;
use super::channels::ChannelRepository;
use super::feeds::FeedRepository;
use super::fulfillment::FulfillmentRepository;
use super::orders::OrderRepository;
use super::taxes::TaxRepository;
use super::{RepositoryError, Store};
use crate::models::{
    Carrier, Channel, ChannelOrderState, Currency, FeedRecord, FulfillmentKey, NewOrderMapping,
    NewPartner, NewPayment, NewProduct, NewSaleOrder, NewSyncLog, NewTax, OrderMapping,
    OrderStateUpdate, Partner, Payment, Pricelist, Product, ProductMapping, SaleOrder, ServiceSlot,
    StoreStatus, SyncLogEntry, Tax, TaxKey, TaxQuery,
};

/// Store backed by a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn channels(&self) -> ChannelRepository<'_> {
        ChannelRepository::new(&self.pool)
    }

    fn taxes(&self) -> TaxRepository<'_> {
        TaxRepository::new(&self.pool)
    }

    fn catalog(&self) -> CatalogRepository<'_> {
        CatalogRepository::new(&self.pool)
    }

    fn orders(&self) -> OrderRepository<'_> {
        OrderRepository::new(&self.pool)
    }

    fn feeds(&self) -> FeedRepository<'_> {
        FeedRepository::new(&self.pool)
    }

    fn fulfillment(&self) -> FulfillmentRepository<'_> {
        FulfillmentRepository::new(&self.pool)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_channel(&self, id: ChannelId) -> Result<Option<Channel>, RepositoryError> {
        self.channels().get(id).await
    }

    async fn set_service_product(
        &self,
        channel_id: ChannelId,
        slot: ServiceSlot,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        self.channels()
            .set_service_product(channel_id, slot, product_id)
            .await
    }

    async fn get_order_state(
        &self,
        channel_id: ChannelId,
        slug: &str,
    ) -> Result<Option<ChannelOrderState>, RepositoryError> {
        self.channels().get_order_state(channel_id, slug).await
    }

    async fn find_tax_mapping(&self, key: &TaxKey) -> Result<Option<TaxId>, RepositoryError> {
        self.taxes().find_mapping(key).await
    }

    async fn find_tax(&self, query: &TaxQuery) -> Result<Option<TaxId>, RepositoryError> {
        self.taxes().find(query).await
    }

    async fn create_tax(&self, tax: &NewTax) -> Result<Tax, RepositoryError> {
        self.taxes().create(tax).await
    }

    async fn create_tax_mapping(&self, key: &TaxKey, tax_id: TaxId) -> Result<TaxId, RepositoryError> {
        self.taxes().create_mapping(key, tax_id).await
    }

    async fn get_partner(&self, id: PartnerId) -> Result<Option<Partner>, RepositoryError> {
        self.catalog().get_partner(id).await
    }

    async fn find_partner(
        &self,
        channel_id: ChannelId,
        store_id: &str,
    ) -> Result<Option<Partner>, RepositoryError> {
        self.catalog().find_partner(channel_id, store_id).await
    }

    async fn upsert_partner(&self, partner: &NewPartner) -> Result<Partner, RepositoryError> {
        self.catalog().upsert_partner(partner).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.catalog().get_product(id).await
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        self.catalog().create_product(product).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        self.catalog().update_product(id, product).await
    }

    async fn find_product_mapping(
        &self,
        channel_id: ChannelId,
        store_product_id: &str,
        store_variant_id: &str,
    ) -> Result<Option<ProductMapping>, RepositoryError> {
        self.catalog()
            .find_product_mapping(channel_id, store_product_id, store_variant_id)
            .await
    }

    async fn find_product_by_code(&self, code: &str) -> Result<Option<Product>, RepositoryError> {
        self.catalog().find_product_by_code(code).await
    }

    async fn find_product_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        self.catalog().find_product_by_barcode(barcode).await
    }

    async fn upsert_product_mapping(&self, mapping: &ProductMapping) -> Result<(), RepositoryError> {
        self.catalog().upsert_product_mapping(mapping).await
    }

    async fn find_carrier(&self, name: &str) -> Result<Option<Carrier>, RepositoryError> {
        self.catalog().find_carrier(name).await
    }

    async fn create_carrier(
        &self,
        name: &str,
        product_id: Option<ProductId>,
    ) -> Result<Carrier, RepositoryError> {
        self.catalog().create_carrier(name, product_id).await
    }

    async fn find_currency(&self, code: CurrencyCode) -> Result<Option<Currency>, RepositoryError> {
        self.catalog().find_currency(code).await
    }

    async fn find_pricelist(
        &self,
        currency_id: CurrencyId,
    ) -> Result<Option<Pricelist>, RepositoryError> {
        self.catalog().find_pricelist(currency_id).await
    }

    async fn create_pricelist(
        &self,
        name: &str,
        currency_id: CurrencyId,
    ) -> Result<Pricelist, RepositoryError> {
        self.catalog().create_pricelist(name, currency_id).await
    }

    async fn get_sale_order(&self, id: SaleOrderId) -> Result<Option<SaleOrder>, RepositoryError> {
        self.orders().get(id).await
    }

    async fn find_sale_order_by_name(
        &self,
        name: &str,
    ) -> Result<Option<SaleOrder>, RepositoryError> {
        self.orders().find_by_name(name).await
    }

    async fn create_sale_order(&self, order: &NewSaleOrder) -> Result<SaleOrder, RepositoryError> {
        self.orders().create(order).await
    }

    async fn rewrite_sale_order(
        &self,
        id: SaleOrderId,
        order: &NewSaleOrder,
    ) -> Result<SaleOrder, RepositoryError> {
        self.orders().rewrite(id, order).await
    }

    async fn update_order_total(
        &self,
        id: SaleOrderId,
        total: Decimal,
    ) -> Result<(), RepositoryError> {
        self.orders().update_total(id, total).await
    }

    async fn update_order_state(
        &self,
        id: SaleOrderId,
        update: OrderStateUpdate,
    ) -> Result<(), RepositoryError> {
        self.orders().update_state(id, update).await
    }

    async fn find_order_mapping(
        &self,
        channel_id: ChannelId,
        store_order_id: &str,
    ) -> Result<Option<OrderMapping>, RepositoryError> {
        self.orders().find_mapping(channel_id, store_order_id).await
    }

    async fn create_order_mapping(
        &self,
        mapping: &NewOrderMapping,
    ) -> Result<OrderMapping, RepositoryError> {
        self.orders().create_mapping(mapping).await
    }

    async fn update_mapping_status(
        &self,
        id: OrderMappingId,
        store_status: &str,
    ) -> Result<(), RepositoryError> {
        self.orders().update_mapping_status(id, store_status).await
    }

    async fn find_payment_by_memo(&self, memo: &str) -> Result<Option<Payment>, RepositoryError> {
        self.orders().find_payment_by_memo(memo).await
    }

    async fn create_payment(&self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        self.orders().create_payment(payment).await
    }

    async fn upsert_feed(
        &self,
        channel_id: ChannelId,
        order: &OrderFeed,
    ) -> Result<FeedRecord, RepositoryError> {
        self.feeds().upsert(channel_id, order).await
    }

    async fn get_feed(&self, id: FeedId) -> Result<Option<FeedRecord>, RepositoryError> {
        self.feeds().get(id).await
    }

    async fn finish_feed(
        &self,
        id: FeedId,
        state: FeedState,
        message: &str,
    ) -> Result<(), RepositoryError> {
        self.feeds().finish(id, state, message).await
    }

    async fn list_feeds(
        &self,
        channel_id: ChannelId,
        states: &[FeedState],
    ) -> Result<Vec<FeedRecord>, RepositoryError> {
        self.feeds().list(channel_id, states).await
    }

    async fn insert_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry, RepositoryError> {
        self.feeds().insert_sync_log(entry).await
    }

    async fn upsert_store_status(&self, status: &StoreStatus) -> Result<(), RepositoryError> {
        self.feeds().upsert_store_status(status).await
    }

    async fn set_store_status_parent(
        &self,
        channel_id: ChannelId,
        store_status_id: i64,
        parent_store_id: Option<i64>,
    ) -> Result<(), RepositoryError> {
        self.feeds()
            .set_store_status_parent(channel_id, store_status_id, parent_store_id)
            .await
    }

    async fn get_fulfillment_link(
        &self,
        key: &FulfillmentKey,
    ) -> Result<Option<String>, RepositoryError> {
        self.fulfillment().get(key).await
    }

    async fn set_fulfillment_link(
        &self,
        key: &FulfillmentKey,
        remote_id: &str,
    ) -> Result<(), RepositoryError> {
        self.fulfillment().set(key, remote_id).await
    }
}

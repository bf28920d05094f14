//! Persistence for the connector.
//!
//! # Database schema: `channel_sync`
//!
//! ## Tables
//!
//! - `channels` / `channel_order_states` - Channel settings and status mapping
//! - `taxes` / `tax_mappings` - Internal taxes and their per-channel keys
//! - `partners`, `products`, `product_mappings`, `carriers` - Order references
//! - `currencies` / `pricelists` - Pricing
//! - `sale_orders` / `sale_order_lines` / `order_mappings` - Imported orders
//! - `payments` - Payments registered without invoices
//! - `order_feeds` / `sync_logs` - Staging and audit trail
//! - `store_statuses` - Store order status catalog
//! - `fulfillment_links` - Records sent to the fulfillment platform
//!
//! # Migrations
//!
//! Migrations are stored in `crates/connector/migrations/` and run via:
//! ```bash
//! cargo run -p channel-sync-cli -- migrate
//! ```
//!
//! Services only talk to the [`Store`] trait. [`PgStore`] backs it with
//! `PostgreSQL`; [`MemoryStore`] keeps everything in process for tests and
//! dry runs.

pub mod catalog;
pub mod channels;
pub mod feeds;
pub mod fulfillment;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod taxes;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use channel_sync_core::{
    ChannelId, CurrencyCode, CurrencyId, FeedId, FeedState, OrderFeed, OrderMappingId, PartnerId,
    ProductId, SaleOrderId, TaxId,
};

use crate::models::{
    Carrier, Channel, ChannelOrderState, Currency, FeedRecord, FulfillmentKey, NewOrderMapping,
    NewPartner, NewPayment, NewProduct, NewSaleOrder, NewSyncLog, NewTax, OrderMapping,
    OrderStateUpdate, Partner, Payment, Pricelist, Product, ProductMapping, SaleOrder, ServiceSlot,
    StoreStatus, SyncLogEntry, Tax, TaxKey, TaxQuery,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate payment memo).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Wrap a column value that failed to parse.
    pub(crate) fn corrupt(column: &str, err: impl std::fmt::Display) -> Self {
        Self::DataCorruption(format!("{column}: {err}"))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Storage operations the import pipeline needs.
///
/// Lookups return `Ok(None)` when nothing matches; only infrastructure
/// failures are errors.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // ---- channels -----------------------------------------------------------

    async fn get_channel(&self, id: ChannelId) -> Result<Option<Channel>, RepositoryError>;

    /// Remember the product created for a channel service slot.
    async fn set_service_product(
        &self,
        channel_id: ChannelId,
        slot: ServiceSlot,
        product_id: ProductId,
    ) -> Result<(), RepositoryError>;

    /// Status mapping for a store slug.
    async fn get_order_state(
        &self,
        channel_id: ChannelId,
        slug: &str,
    ) -> Result<Option<ChannelOrderState>, RepositoryError>;

    // ---- taxes --------------------------------------------------------------

    async fn find_tax_mapping(&self, key: &TaxKey) -> Result<Option<TaxId>, RepositoryError>;

    async fn find_tax(&self, query: &TaxQuery) -> Result<Option<TaxId>, RepositoryError>;

    async fn create_tax(&self, tax: &NewTax) -> Result<Tax, RepositoryError>;

    /// Record a mapping. When a concurrent writer got there first, returns the
    /// tax already mapped to `key`.
    async fn create_tax_mapping(&self, key: &TaxKey, tax_id: TaxId) -> Result<TaxId, RepositoryError>;

    // ---- partners -----------------------------------------------------------

    async fn get_partner(&self, id: PartnerId) -> Result<Option<Partner>, RepositoryError>;

    async fn find_partner(
        &self,
        channel_id: ChannelId,
        store_id: &str,
    ) -> Result<Option<Partner>, RepositoryError>;

    /// Insert a partner, or refresh the one with the same store ID.
    async fn upsert_partner(&self, partner: &NewPartner) -> Result<Partner, RepositoryError>;

    // ---- products -----------------------------------------------------------

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError>;

    async fn find_product_mapping(
        &self,
        channel_id: ChannelId,
        store_product_id: &str,
        store_variant_id: &str,
    ) -> Result<Option<ProductMapping>, RepositoryError>;

    async fn find_product_by_code(&self, code: &str) -> Result<Option<Product>, RepositoryError>;

    async fn find_product_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<Product>, RepositoryError>;

    async fn upsert_product_mapping(&self, mapping: &ProductMapping) -> Result<(), RepositoryError>;

    // ---- carriers & pricing -------------------------------------------------

    async fn find_carrier(&self, name: &str) -> Result<Option<Carrier>, RepositoryError>;

    async fn create_carrier(
        &self,
        name: &str,
        product_id: Option<ProductId>,
    ) -> Result<Carrier, RepositoryError>;

    async fn find_currency(&self, code: CurrencyCode) -> Result<Option<Currency>, RepositoryError>;

    async fn find_pricelist(
        &self,
        currency_id: CurrencyId,
    ) -> Result<Option<Pricelist>, RepositoryError>;

    async fn create_pricelist(
        &self,
        name: &str,
        currency_id: CurrencyId,
    ) -> Result<Pricelist, RepositoryError>;

    // ---- sale orders --------------------------------------------------------

    async fn get_sale_order(&self, id: SaleOrderId) -> Result<Option<SaleOrder>, RepositoryError>;

    async fn find_sale_order_by_name(
        &self,
        name: &str,
    ) -> Result<Option<SaleOrder>, RepositoryError>;

    async fn create_sale_order(&self, order: &NewSaleOrder) -> Result<SaleOrder, RepositoryError>;

    /// Replace the header fields and all lines of an existing order.
    async fn rewrite_sale_order(
        &self,
        id: SaleOrderId,
        order: &NewSaleOrder,
    ) -> Result<SaleOrder, RepositoryError>;

    async fn update_order_total(
        &self,
        id: SaleOrderId,
        total: Decimal,
    ) -> Result<(), RepositoryError>;

    async fn update_order_state(
        &self,
        id: SaleOrderId,
        update: OrderStateUpdate,
    ) -> Result<(), RepositoryError>;

    // ---- order mappings -----------------------------------------------------

    async fn find_order_mapping(
        &self,
        channel_id: ChannelId,
        store_order_id: &str,
    ) -> Result<Option<OrderMapping>, RepositoryError>;

    async fn create_order_mapping(
        &self,
        mapping: &NewOrderMapping,
    ) -> Result<OrderMapping, RepositoryError>;

    async fn update_mapping_status(
        &self,
        id: OrderMappingId,
        store_status: &str,
    ) -> Result<(), RepositoryError>;

    // ---- payments -----------------------------------------------------------

    async fn find_payment_by_memo(&self, memo: &str) -> Result<Option<Payment>, RepositoryError>;

    async fn create_payment(&self, payment: &NewPayment) -> Result<Payment, RepositoryError>;

    // ---- feeds & log --------------------------------------------------------

    /// Stage a normalized order. A feed already staged for the same store
    /// order is overwritten and moved to `update`.
    async fn upsert_feed(
        &self,
        channel_id: ChannelId,
        order: &OrderFeed,
    ) -> Result<FeedRecord, RepositoryError>;

    async fn get_feed(&self, id: FeedId) -> Result<Option<FeedRecord>, RepositoryError>;

    /// Set the terminal state and full message of a feed.
    async fn finish_feed(
        &self,
        id: FeedId,
        state: FeedState,
        message: &str,
    ) -> Result<(), RepositoryError>;

    async fn list_feeds(
        &self,
        channel_id: ChannelId,
        states: &[FeedState],
    ) -> Result<Vec<FeedRecord>, RepositoryError>;

    async fn insert_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry, RepositoryError>;

    // ---- store status catalog -----------------------------------------------

    /// Insert or refresh a status by platform ID. The parent link is left
    /// untouched.
    async fn upsert_store_status(&self, status: &StoreStatus) -> Result<(), RepositoryError>;

    async fn set_store_status_parent(
        &self,
        channel_id: ChannelId,
        store_status_id: i64,
        parent_store_id: Option<i64>,
    ) -> Result<(), RepositoryError>;

    // ---- fulfillment links --------------------------------------------------

    async fn get_fulfillment_link(
        &self,
        key: &FulfillmentKey,
    ) -> Result<Option<String>, RepositoryError>;

    async fn set_fulfillment_link(
        &self,
        key: &FulfillmentKey,
        remote_id: &str,
    ) -> Result<(), RepositoryError>;
}

/// Load an order that must exist.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order is missing.
pub async fn require_sale_order<S: Store + ?Sized>(
    store: &S,
    id: SaleOrderId,
) -> Result<SaleOrder, RepositoryError> {
    store.get_sale_order(id).await?.ok_or(RepositoryError::NotFound)
}

/// Convert an `i32` array column into typed IDs.
pub(crate) fn tax_ids_from_column(ids: Vec<i32>) -> Vec<TaxId> {
    ids.into_iter().map(TaxId::new).collect()
}

/// Convert typed tax IDs into an `i32` array column.
pub(crate) fn tax_ids_to_column(ids: &[TaxId]) -> Vec<i32> {
    ids.iter().map(TaxId::as_i32).collect()
}

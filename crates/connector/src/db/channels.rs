//! Channel settings and per-channel status mapping.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use channel_sync_core::{ChannelId, ProductId};

use super::RepositoryError;
use crate::models::{Channel, ChannelOrderState, ServiceSlot};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    id: i32,
    kind: String,
    name: String,
    default_tax_type: String,
    tax_on_discount_line: bool,
    use_store_order_name: bool,
    order_start_date: Option<DateTime<Utc>>,
    delivery_product_id: Option<i32>,
    discount_product_id: Option<i32>,
    cod_product_id: Option<i32>,
    company_currency: String,
}

impl TryFrom<ChannelRow> for Channel {
    type Error = RepositoryError;

    fn try_from(row: ChannelRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ChannelId::new(row.id),
            kind: row
                .kind
                .parse()
                .map_err(|e| RepositoryError::corrupt("channels.kind", e))?,
            name: row.name,
            default_tax_type: row
                .default_tax_type
                .parse()
                .map_err(|e| RepositoryError::corrupt("channels.default_tax_type", e))?,
            tax_on_discount_line: row.tax_on_discount_line,
            use_store_order_name: row.use_store_order_name,
            order_start_date: row.order_start_date,
            delivery_product_id: row.delivery_product_id.map(ProductId::new),
            discount_product_id: row.discount_product_id.map(ProductId::new),
            cod_product_id: row.cod_product_id.map(ProductId::new),
            company_currency: row
                .company_currency
                .parse()
                .map_err(|e| RepositoryError::corrupt("channels.company_currency", e))?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderStateRow {
    channel_id: i32,
    store_slug: String,
    confirm: bool,
    invoice: bool,
    invoice_paid: bool,
    ship: bool,
    cancel: bool,
    make_payment: bool,
}

impl From<OrderStateRow> for ChannelOrderState {
    fn from(row: OrderStateRow) -> Self {
        Self {
            channel_id: ChannelId::new(row.channel_id),
            store_slug: row.store_slug,
            confirm: row.confirm,
            invoice: row.invoice,
            invoice_paid: row.invoice_paid,
            ship: row.ship,
            cancel: row.cancel,
            make_payment: row.make_payment,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for channel settings.
pub struct ChannelRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChannelRepository<'a> {
    /// Create a new channel repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a channel by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if an enum column holds an unknown value.
    pub async fn get(&self, id: ChannelId) -> Result<Option<Channel>, RepositoryError> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r"
            SELECT id, kind, name, default_tax_type, tax_on_discount_line,
                   use_store_order_name, order_start_date, delivery_product_id,
                   discount_product_id, cod_product_id, company_currency
            FROM channel_sync.channels
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Channel::try_from).transpose()
    }

    /// Insert or replace a channel with an explicit ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, channel: &Channel) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO channel_sync.channels (
                id, kind, name, default_tax_type, tax_on_discount_line,
                use_store_order_name, order_start_date, company_currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                kind = EXCLUDED.kind,
                name = EXCLUDED.name,
                default_tax_type = EXCLUDED.default_tax_type,
                tax_on_discount_line = EXCLUDED.tax_on_discount_line,
                use_store_order_name = EXCLUDED.use_store_order_name,
                order_start_date = EXCLUDED.order_start_date,
                company_currency = EXCLUDED.company_currency
            ",
        )
        .bind(channel.id)
        .bind(channel.kind.as_str())
        .bind(&channel.name)
        .bind(channel.default_tax_type.as_str())
        .bind(channel.tax_on_discount_line)
        .bind(channel.use_store_order_name)
        .bind(channel.order_start_date)
        .bind(channel.company_currency.as_str())
        .execute(self.pool)
        .await?;

        // Keep the serial ahead of explicitly chosen IDs.
        sqlx::query(
            r"
            SELECT setval(
                pg_get_serial_sequence('channel_sync.channels', 'id'),
                GREATEST((SELECT MAX(id) FROM channel_sync.channels), 1)
            )
            ",
        )
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Store the product created for a service slot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the channel does not exist.
    pub async fn set_service_product(
        &self,
        id: ChannelId,
        slot: ServiceSlot,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let sql = match slot {
            ServiceSlot::Delivery => {
                "UPDATE channel_sync.channels SET delivery_product_id = $2 WHERE id = $1"
            }
            ServiceSlot::Discount => {
                "UPDATE channel_sync.channels SET discount_product_id = $2 WHERE id = $1"
            }
            ServiceSlot::CashOnDelivery => {
                "UPDATE channel_sync.channels SET cod_product_id = $2 WHERE id = $1"
            }
        };

        let result = sqlx::query(sql)
            .bind(id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get the status mapping for a slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_order_state(
        &self,
        channel_id: ChannelId,
        slug: &str,
    ) -> Result<Option<ChannelOrderState>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderStateRow>(
            r"
            SELECT channel_id, store_slug, confirm, invoice, invoice_paid,
                   ship, cancel, make_payment
            FROM channel_sync.channel_order_states
            WHERE channel_id = $1 AND store_slug = $2
            ",
        )
        .bind(channel_id)
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ChannelOrderState::from))
    }

    /// Insert or replace a status mapping.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_order_state(&self, state: &ChannelOrderState) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO channel_sync.channel_order_states (
                channel_id, store_slug, confirm, invoice, invoice_paid,
                ship, cancel, make_payment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (channel_id, store_slug) DO UPDATE SET
                confirm = EXCLUDED.confirm,
                invoice = EXCLUDED.invoice,
                invoice_paid = EXCLUDED.invoice_paid,
                ship = EXCLUDED.ship,
                cancel = EXCLUDED.cancel,
                make_payment = EXCLUDED.make_payment
            ",
        )
        .bind(state.channel_id)
        .bind(&state.store_slug)
        .bind(state.confirm)
        .bind(state.invoice)
        .bind(state.invoice_paid)
        .bind(state.ship)
        .bind(state.cancel)
        .bind(state.make_payment)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

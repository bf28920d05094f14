//! Sales orders, their lines, store mappings and payments.
//!
//! Orders own their lines: they are written in the same transaction as the
//! header and rewritten wholesale on update.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use channel_sync_core::{
    CarrierId, ChannelId, OrderMappingId, PartnerId, PaymentId, PricelistId, ProductId,
    SaleOrderId,
};

use super::{RepositoryError, tax_ids_from_column, tax_ids_to_column};
use crate::models::{
    NewOrderMapping, NewPayment, NewSaleOrder, OrderMapping, OrderStateUpdate, Payment,
    SaleOrder, SaleOrderLine,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleOrderRow {
    id: i32,
    name: String,
    channel_id: i32,
    partner_id: i32,
    pricelist_id: i32,
    carrier_id: Option<i32>,
    date_order: Option<DateTime<Utc>>,
    payment_method: String,
    state: String,
    invoice_state: String,
    shipped: bool,
    total_amount: Decimal,
}

impl SaleOrderRow {
    fn into_order(self, lines: Vec<SaleOrderLine>) -> Result<SaleOrder, RepositoryError> {
        Ok(SaleOrder {
            id: SaleOrderId::new(self.id),
            name: self.name,
            channel_id: ChannelId::new(self.channel_id),
            partner_id: PartnerId::new(self.partner_id),
            pricelist_id: PricelistId::new(self.pricelist_id),
            carrier_id: self.carrier_id.map(CarrierId::new),
            date_order: self.date_order.map(|d| d.fixed_offset()),
            payment_method: self.payment_method,
            state: self
                .state
                .parse()
                .map_err(|e| RepositoryError::corrupt("sale_orders.state", e))?,
            invoice_state: self
                .invoice_state
                .parse()
                .map_err(|e| RepositoryError::corrupt("sale_orders.invoice_state", e))?,
            shipped: self.shipped,
            total_amount: self.total_amount,
            lines,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleOrderLineRow {
    name: String,
    product_id: i32,
    price_unit: Decimal,
    quantity: Decimal,
    discount_percent: Decimal,
    tax_ids: Vec<i32>,
    source: String,
}

impl TryFrom<SaleOrderLineRow> for SaleOrderLine {
    type Error = RepositoryError;

    fn try_from(row: SaleOrderLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            name: row.name,
            product_id: ProductId::new(row.product_id),
            price_unit: row.price_unit,
            quantity: row.quantity,
            discount_percent: row.discount_percent,
            tax_ids: tax_ids_from_column(row.tax_ids),
            source: row
                .source
                .parse()
                .map_err(|e| RepositoryError::corrupt("sale_order_lines.source", e))?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderMappingRow {
    id: i32,
    channel_id: i32,
    store_order_id: String,
    sale_order_id: i32,
    store_source: String,
    store_status: String,
}

impl From<OrderMappingRow> for OrderMapping {
    fn from(row: OrderMappingRow) -> Self {
        Self {
            id: OrderMappingId::new(row.id),
            channel_id: ChannelId::new(row.channel_id),
            store_order_id: row.store_order_id,
            sale_order_id: SaleOrderId::new(row.sale_order_id),
            store_source: row.store_source,
            store_status: row.store_status,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i32,
    sale_order_id: i32,
    memo: String,
    amount: Decimal,
    journal: String,
    paid_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: PaymentId::new(row.id),
            sale_order_id: SaleOrderId::new(row.sale_order_id),
            memo: row.memo,
            amount: row.amount,
            journal: row.journal,
            paid_at: row.paid_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, name, channel_id, partner_id, pricelist_id, carrier_id, \
    date_order, payment_method, state, invoice_state, shipped, total_amount";

// =============================================================================
// Repository
// =============================================================================

/// Repository for sales orders and everything keyed on them.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn load_lines(&self, id: SaleOrderId) -> Result<Vec<SaleOrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, SaleOrderLineRow>(
            r"
            SELECT name, product_id, price_unit, quantity, discount_percent, tax_ids, source
            FROM channel_sync.sale_order_lines
            WHERE sale_order_id = $1
            ORDER BY sequence
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(SaleOrderLine::try_from).collect()
    }

    async fn load(&self, row: Option<SaleOrderRow>) -> Result<Option<SaleOrder>, RepositoryError> {
        match row {
            Some(row) => {
                let lines = self.load_lines(SaleOrderId::new(row.id)).await?;
                row.into_order(lines).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: SaleOrderId) -> Result<Option<SaleOrder>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM channel_sync.sale_orders WHERE id = $1");
        let row = sqlx::query_as::<_, SaleOrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        self.load(row).await
    }

    /// Find the oldest order with a given name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<SaleOrder>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM channel_sync.sale_orders WHERE name = $1 ORDER BY id LIMIT 1"
        );
        let row = sqlx::query_as::<_, SaleOrderRow>(&sql)
            .bind(name)
            .fetch_optional(self.pool)
            .await?;

        self.load(row).await
    }

    /// Create an order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is
    /// written in that case.
    pub async fn create(&self, order: &NewSaleOrder) -> Result<SaleOrder, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO channel_sync.sale_orders (
                name, channel_id, partner_id, pricelist_id, carrier_id,
                date_order, payment_method, total_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(&order.name)
        .bind(order.channel_id)
        .bind(order.partner_id)
        .bind(order.pricelist_id)
        .bind(order.carrier_id)
        .bind(order.date_order.map(|d| d.to_utc()))
        .bind(&order.payment_method)
        .bind(order.total_amount)
        .fetch_one(&mut *tx)
        .await?;

        let id = SaleOrderId::new(id);
        insert_lines(&mut tx, id, &order.lines).await?;
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace an order's header fields and lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn rewrite(
        &self,
        id: SaleOrderId,
        order: &NewSaleOrder,
    ) -> Result<SaleOrder, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE channel_sync.sale_orders
            SET name = $2, partner_id = $3, pricelist_id = $4, carrier_id = $5,
                date_order = $6, payment_method = $7, total_amount = $8,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&order.name)
        .bind(order.partner_id)
        .bind(order.pricelist_id)
        .bind(order.carrier_id)
        .bind(order.date_order.map(|d| d.to_utc()))
        .bind(&order.payment_method)
        .bind(order.total_amount)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM channel_sync.sale_order_lines WHERE sale_order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut tx, id, &order.lines).await?;
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Refresh only the stored total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_total(&self, id: SaleOrderId, total: Decimal) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE channel_sync.sale_orders SET total_amount = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(total)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Apply a status sync result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_state(
        &self,
        id: SaleOrderId,
        update: OrderStateUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE channel_sync.sale_orders
            SET state = $2, invoice_state = $3, shipped = $4, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.state.as_str())
        .bind(update.invoice_state.as_str())
        .bind(update.shipped)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mappings
    // -------------------------------------------------------------------------

    /// Find the mapping for a store order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_mapping(
        &self,
        channel_id: ChannelId,
        store_order_id: &str,
    ) -> Result<Option<OrderMapping>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderMappingRow>(
            r"
            SELECT id, channel_id, store_order_id, sale_order_id, store_source, store_status
            FROM channel_sync.order_mappings
            WHERE channel_id = $1 AND store_order_id = $2
            ",
        )
        .bind(channel_id)
        .bind(store_order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(OrderMapping::from))
    }

    /// Create a mapping.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the store order is already mapped.
    pub async fn create_mapping(
        &self,
        mapping: &NewOrderMapping,
    ) -> Result<OrderMapping, RepositoryError> {
        let row = sqlx::query_as::<_, OrderMappingRow>(
            r"
            INSERT INTO channel_sync.order_mappings (
                channel_id, store_order_id, sale_order_id, store_source, store_status
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (channel_id, store_order_id) DO NOTHING
            RETURNING id, channel_id, store_order_id, sale_order_id, store_source, store_status
            ",
        )
        .bind(mapping.channel_id)
        .bind(&mapping.store_order_id)
        .bind(mapping.sale_order_id)
        .bind(&mapping.store_source)
        .bind(&mapping.store_status)
        .fetch_optional(self.pool)
        .await?;

        row.map(OrderMapping::from).ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "store order {} is already mapped",
                mapping.store_order_id
            ))
        })
    }

    /// Record the latest store status on a mapping.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_mapping_status(
        &self,
        id: OrderMappingId,
        store_status: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE channel_sync.order_mappings SET store_status = $2 WHERE id = $1")
            .bind(id)
            .bind(store_status)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    /// Find a payment by memo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_payment_by_memo(&self, memo: &str) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r"
            SELECT id, sale_order_id, memo, amount, journal, paid_at
            FROM channel_sync.payments
            WHERE memo = $1
            ",
        )
        .bind(memo)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Payment::from))
    }

    /// Create a payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a payment with the memo exists.
    pub async fn create_payment(&self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r"
            INSERT INTO channel_sync.payments (sale_order_id, memo, amount, journal, paid_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (memo) DO NOTHING
            RETURNING id, sale_order_id, memo, amount, journal, paid_at
            ",
        )
        .bind(payment.sale_order_id)
        .bind(&payment.memo)
        .bind(payment.amount)
        .bind(&payment.journal)
        .bind(payment.paid_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(Payment::from).ok_or_else(|| {
            RepositoryError::Conflict(format!("payment {} already exists", payment.memo))
        })
    }
}

async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    order_id: SaleOrderId,
    lines: &[SaleOrderLine],
) -> Result<(), RepositoryError> {
    for (sequence, line) in (1_i32..).zip(lines) {
        sqlx::query(
            r"
            INSERT INTO channel_sync.sale_order_lines (
                sale_order_id, sequence, name, product_id, price_unit, quantity,
                discount_percent, tax_ids, source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(order_id)
        .bind(sequence)
        .bind(&line.name)
        .bind(line.product_id)
        .bind(line.price_unit)
        .bind(line.quantity)
        .bind(line.discount_percent)
        .bind(tax_ids_to_column(&line.tax_ids))
        .bind(line.source.as_str())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

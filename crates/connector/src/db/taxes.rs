//! Taxes and per-channel tax mappings.

use rust_decimal::Decimal;
use sqlx::PgPool;

use channel_sync_core::TaxId;

use super::RepositoryError;
use crate::models::{NewTax, Tax, TaxKey, TaxQuery};

#[derive(Debug, sqlx::FromRow)]
struct TaxRow {
    id: i32,
    name: String,
    amount: Decimal,
    amount_type: String,
    price_include: bool,
}

impl TryFrom<TaxRow> for Tax {
    type Error = RepositoryError;

    fn try_from(row: TaxRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TaxId::new(row.id),
            name: row.name,
            amount: row.amount.normalize(),
            amount_type: row
                .amount_type
                .parse()
                .map_err(|e| RepositoryError::corrupt("taxes.amount_type", e))?,
            price_include: row.price_include,
        })
    }
}

/// Repository for taxes.
pub struct TaxRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TaxRepository<'a> {
    /// Create a new tax repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the tax mapped to a channel key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_mapping(&self, key: &TaxKey) -> Result<Option<TaxId>, RepositoryError> {
        let id: Option<i32> = sqlx::query_scalar(
            r"
            SELECT tax_id
            FROM channel_sync.tax_mappings
            WHERE channel_id = $1 AND rate = $2 AND amount_type = $3 AND inclusive = $4
            ",
        )
        .bind(key.channel_id)
        .bind(key.rate)
        .bind(key.amount_type.as_str())
        .bind(key.inclusive)
        .fetch_optional(self.pool)
        .await?;

        Ok(id.map(TaxId::new))
    }

    /// Find a tax by amount, type, inclusivity and optionally name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, query: &TaxQuery) -> Result<Option<TaxId>, RepositoryError> {
        let id: Option<i32> = sqlx::query_scalar(
            r"
            SELECT id
            FROM channel_sync.taxes
            WHERE amount = $1
              AND amount_type = $2
              AND price_include = $3
              AND ($4::TEXT IS NULL OR name = $4)
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(query.amount)
        .bind(query.amount_type.as_str())
        .bind(query.price_include)
        .bind(query.name.as_deref())
        .fetch_optional(self.pool)
        .await?;

        Ok(id.map(TaxId::new))
    }

    /// Create a tax.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, tax: &NewTax) -> Result<Tax, RepositoryError> {
        let row = sqlx::query_as::<_, TaxRow>(
            r"
            INSERT INTO channel_sync.taxes (name, amount, amount_type, price_include)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, amount, amount_type, price_include
            ",
        )
        .bind(&tax.name)
        .bind(tax.amount)
        .bind(tax.amount_type.as_str())
        .bind(tax.price_include)
        .fetch_one(self.pool)
        .await?;

        Tax::try_from(row)
    }

    /// Record a mapping, keeping the first writer's tax on conflict.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_mapping(&self, key: &TaxKey, tax_id: TaxId) -> Result<TaxId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO channel_sync.tax_mappings (channel_id, rate, amount_type, inclusive, tax_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (channel_id, rate, amount_type, inclusive)
                DO UPDATE SET tax_id = channel_sync.tax_mappings.tax_id
            RETURNING tax_id
            ",
        )
        .bind(key.channel_id)
        .bind(key.rate)
        .bind(key.amount_type.as_str())
        .bind(key.inclusive)
        .bind(tax_id)
        .fetch_one(self.pool)
        .await?;

        Ok(TaxId::new(id))
    }
}

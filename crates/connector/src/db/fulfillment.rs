//! Fulfillment platform links.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::FulfillmentKey;

/// Repository for records already sent to the fulfillment platform.
pub struct FulfillmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FulfillmentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Remote ID linked to `key`, if the record was sent before.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &FulfillmentKey) -> Result<Option<String>, RepositoryError> {
        let remote_id = sqlx::query_scalar::<_, String>(
            r"
            SELECT remote_id
            FROM channel_sync.fulfillment_links
            WHERE record = $1 AND local_id = $2
            ",
        )
        .bind(key.record.as_str())
        .bind(key.local_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(remote_id)
    }

    /// Link `key` to `remote_id`, replacing an earlier link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set(&self, key: &FulfillmentKey, remote_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO channel_sync.fulfillment_links (record, local_id, remote_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (record, local_id) DO UPDATE SET
                remote_id = EXCLUDED.remote_id,
                updated_at = NOW()
            ",
        )
        .bind(key.record.as_str())
        .bind(key.local_id)
        .bind(remote_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

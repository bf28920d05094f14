//! Order feeds, the sync log and the store status catalog.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use channel_sync_core::{ChannelId, FeedId, FeedState, OrderFeed, SaleOrderId, SyncLogId};

use super::RepositoryError;
use crate::models::{FeedRecord, NewSyncLog, StoreStatus, SyncAction, SyncLogEntry};

#[derive(Debug, sqlx::FromRow)]
struct FeedRow {
    id: i32,
    channel_id: i32,
    state: String,
    message: String,
    payload: Json<OrderFeed>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FeedRow> for FeedRecord {
    type Error = RepositoryError;

    fn try_from(row: FeedRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FeedId::new(row.id),
            channel_id: ChannelId::new(row.channel_id),
            state: row
                .state
                .parse()
                .map_err(|e| RepositoryError::corrupt("order_feeds.state", e))?,
            message: row.message,
            order: row.payload.0,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SyncLogRow {
    id: i32,
    channel_id: i32,
    status: String,
    action_on: String,
    action_type: String,
    store_id: String,
    sale_order_id: Option<i32>,
    summary: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SyncLogRow> for SyncLogEntry {
    type Error = RepositoryError;

    fn try_from(row: SyncLogRow) -> Result<Self, Self::Error> {
        let action_type = match row.action_type.as_str() {
            "import" => SyncAction::Import,
            "export" => SyncAction::Export,
            other => return Err(RepositoryError::corrupt("sync_logs.action_type", other)),
        };

        Ok(Self {
            id: SyncLogId::new(row.id),
            channel_id: ChannelId::new(row.channel_id),
            status: row
                .status
                .parse()
                .map_err(|e| RepositoryError::corrupt("sync_logs.status", e))?,
            action_on: row.action_on,
            action_type,
            store_id: row.store_id,
            sale_order_id: row.sale_order_id.map(SaleOrderId::new),
            summary: row.summary,
            created_at: row.created_at,
        })
    }
}

const FEED_COLUMNS: &str = "id, channel_id, state, message, payload, updated_at";

/// Repository for staging and audit records.
pub struct FeedRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new feed repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Stage an order, moving an existing feed for the same store order to
    /// `update`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        channel_id: ChannelId,
        order: &OrderFeed,
    ) -> Result<FeedRecord, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO channel_sync.order_feeds (channel_id, store_id, state, payload)
            VALUES ($1, $2, 'draft', $3)
            ON CONFLICT (channel_id, store_id) DO UPDATE SET
                payload = EXCLUDED.payload,
                state = 'update',
                updated_at = NOW()
            RETURNING {FEED_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(channel_id)
            .bind(&order.store_id)
            .bind(Json(order))
            .fetch_one(self.pool)
            .await?;

        FeedRecord::try_from(row)
    }

    /// Get a feed by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: FeedId) -> Result<Option<FeedRecord>, RepositoryError> {
        let sql = format!("SELECT {FEED_COLUMNS} FROM channel_sync.order_feeds WHERE id = $1");
        let row = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(FeedRecord::try_from).transpose()
    }

    /// Set a feed's state and message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the feed does not exist.
    pub async fn finish(
        &self,
        id: FeedId,
        state: FeedState,
        message: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE channel_sync.order_feeds
            SET state = $2, message = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(state.as_str())
        .bind(message)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List a channel's feeds in any of `states`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        channel_id: ChannelId,
        states: &[FeedState],
    ) -> Result<Vec<FeedRecord>, RepositoryError> {
        let states: Vec<&str> = states.iter().map(FeedState::as_str).collect();
        let sql = format!(
            r"
            SELECT {FEED_COLUMNS}
            FROM channel_sync.order_feeds
            WHERE channel_id = $1 AND state = ANY($2)
            ORDER BY id
            "
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(channel_id)
            .bind(states)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(FeedRecord::try_from).collect()
    }

    /// Append to the sync log.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry, RepositoryError> {
        let row = sqlx::query_as::<_, SyncLogRow>(
            r"
            INSERT INTO channel_sync.sync_logs (
                channel_id, status, action_on, action_type, store_id, sale_order_id, summary
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, channel_id, status, action_on, action_type, store_id,
                      sale_order_id, summary, created_at
            ",
        )
        .bind(entry.channel_id)
        .bind(entry.status.as_str())
        .bind(&entry.action_on)
        .bind(entry.action_type.as_str())
        .bind(&entry.store_id)
        .bind(entry.sale_order_id)
        .bind(&entry.summary)
        .fetch_one(self.pool)
        .await?;

        SyncLogEntry::try_from(row)
    }

    /// Insert or refresh a store status, leaving its parent link alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_store_status(&self, status: &StoreStatus) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO channel_sync.store_statuses (
                channel_id, store_status_id, name, slug, status_type, sort, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (channel_id, store_status_id) DO UPDATE SET
                name = EXCLUDED.name,
                slug = EXCLUDED.slug,
                status_type = EXCLUDED.status_type,
                sort = EXCLUDED.sort,
                active = EXCLUDED.active
            ",
        )
        .bind(status.channel_id)
        .bind(status.store_status_id)
        .bind(&status.name)
        .bind(&status.slug)
        .bind(&status.status_type)
        .bind(status.sort)
        .bind(status.active)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Point a status at its parent, or clear the link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_store_status_parent(
        &self,
        channel_id: ChannelId,
        store_status_id: i64,
        parent_store_id: Option<i64>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE channel_sync.store_statuses
            SET parent_store_id = $3
            WHERE channel_id = $1 AND store_status_id = $2
            ",
        )
        .bind(channel_id)
        .bind(store_status_id)
        .bind(parent_store_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

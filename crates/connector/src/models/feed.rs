//! Staged order feeds and the sync log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use channel_sync_core::{ChannelId, FeedId, FeedState, OrderFeed, SaleOrderId, SyncLogId, SyncStatus};

/// A normalized order waiting for (or done with) import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub id: FeedId,
    pub channel_id: ChannelId,
    pub state: FeedState,
    /// Import messages, newest first, joined with `<br/>`.
    pub message: String,
    pub order: OrderFeed,
    pub updated_at: DateTime<Utc>,
}

impl FeedRecord {
    /// Platform order ID of the staged order.
    #[must_use]
    pub fn store_id(&self) -> &str {
        &self.order.store_id
    }

    /// Whether the import ended in error and can be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.state, FeedState::Error | FeedState::Draft | FeedState::Update)
    }
}

/// Prepend `new` to an existing feed message.
#[must_use]
pub fn prepend_message(new: &str, old: &str) -> String {
    format!("{new} <br/> {old}")
}

/// What a sync log entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Import,
    Export,
}

impl SyncAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
        }
    }
}

/// One line of the sync log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: SyncLogId,
    pub channel_id: ChannelId,
    pub status: SyncStatus,
    /// Object kind, e.g. `order`.
    pub action_on: String,
    pub action_type: SyncAction,
    pub store_id: String,
    pub sale_order_id: Option<SaleOrderId>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new sync log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncLog {
    pub channel_id: ChannelId,
    pub status: SyncStatus,
    pub action_on: String,
    pub action_type: SyncAction,
    pub store_id: String,
    pub sale_order_id: Option<SaleOrderId>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepend_message() {
        assert_eq!(
            prepend_message("<br/> Order 7 successfully evaluated", ""),
            "<br/> Order 7 successfully evaluated <br/> "
        );
        assert_eq!(prepend_message("second", "first"), "second <br/> first");
    }
}

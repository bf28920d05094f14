//! Store order status catalog mirrored from the platform.

use serde::{Deserialize, Serialize};

use channel_sync_core::ChannelId;

/// One order status as defined in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub channel_id: ChannelId,
    /// Platform status ID.
    pub store_status_id: i64,
    pub name: String,
    pub slug: String,
    /// Platform status type (`original` or `custom`).
    pub status_type: String,
    pub sort: i32,
    pub active: bool,
    /// Platform ID of the parent status, when it is known locally.
    pub parent_store_id: Option<i64>,
}

//! Mirror of the store's order status list.

use std::collections::HashSet;

use thiserror::Error;
use tracing::instrument;

use channel_sync_core::ChannelId;

use crate::db::{RepositoryError, Store};
use crate::models::StoreStatus;
use crate::payload::SallaStatus;
use crate::salla::{SallaClient, SallaError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Salla(#[from] SallaError),

    #[error(transparent)]
    Database(#[from] RepositoryError),
}

/// Fetch the store's statuses and mirror them.
///
/// # Errors
///
/// Returns `CatalogError` if the fetch or any write fails.
#[instrument(skip(client, store))]
pub async fn sync_from_salla<S: Store + ?Sized>(
    client: &SallaClient,
    store: &S,
    channel_id: ChannelId,
) -> Result<usize, CatalogError> {
    let statuses = client.list_order_statuses().await?;
    Ok(sync_statuses(store, channel_id, &statuses).await?)
}

/// Mirror `statuses` for a channel and return how many were stored.
///
/// Statuses are written first and parents linked second, so a parent listed
/// after its child still links. A parent not in the batch is cleared.
///
/// # Errors
///
/// Returns `RepositoryError` if a write fails.
#[instrument(skip(store, statuses), fields(count = statuses.len()))]
pub async fn sync_statuses<S: Store + ?Sized>(
    store: &S,
    channel_id: ChannelId,
    statuses: &[SallaStatus],
) -> Result<usize, RepositoryError> {
    let mut seen = HashSet::new();
    for status in statuses {
        let Some(id) = status.id else {
            tracing::debug!(slug = ?status.slug, "Skipping status without ID");
            continue;
        };
        store.upsert_store_status(&store_status(channel_id, id, status)).await?;
        seen.insert(id);
    }

    for status in statuses {
        let Some(id) = status.id else { continue };
        let parent = status
            .parent
            .as_ref()
            .and_then(|p| p.id)
            .filter(|parent| seen.contains(parent) && *parent != id);
        store.set_store_status_parent(channel_id, id, parent).await?;
    }

    tracing::info!(synced = seen.len(), "Synced store order statuses");
    Ok(seen.len())
}

fn store_status(channel_id: ChannelId, id: i64, status: &SallaStatus) -> StoreStatus {
    let name = status.name.clone().unwrap_or_default();
    StoreStatus {
        channel_id,
        store_status_id: id,
        slug: status.slug.clone().unwrap_or_else(|| name.clone()),
        name,
        status_type: status
            .status_type
            .clone()
            .unwrap_or_else(|| "original".to_string()),
        sort: status
            .sort
            .and_then(|s| i32::try_from(s).ok())
            .unwrap_or_default(),
        active: status.is_active,
        parent_store_id: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_two_pass_parent_linking() {
        let statuses: Vec<SallaStatus> = serde_json::from_value(json!([
            {"id": 2, "name": "Shipped to branch", "slug": "shipped_branch", "type": "custom",
             "sort": 4, "is_active": true, "parent": {"id": 1}},
            {"id": 1, "name": "Delivering", "slug": "delivering", "type": "original",
             "sort": 3, "is_active": true, "parent": null},
            {"id": 3, "name": "Orphan", "slug": "orphan", "parent": {"id": 99}},
            {"name": "No ID", "slug": "no_id"}
        ]))
        .unwrap();

        let store = MemoryStore::new();
        let count = sync_statuses(&store, ChannelId::new(1), &statuses).await.unwrap();
        assert_eq!(count, 3);

        let mut stored = store.store_statuses().await;
        stored.sort_by_key(|s| s.store_status_id);
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].parent_store_id, None);
        assert_eq!(stored[1].parent_store_id, Some(1));
        assert_eq!(stored[1].status_type, "custom");
        assert_eq!(stored[2].parent_store_id, None);
        assert!(!stored[2].active);
    }

    #[tokio::test]
    async fn test_resync_updates_in_place() {
        let store = MemoryStore::new();
        let first: Vec<SallaStatus> =
            serde_json::from_value(json!([{"id": 1, "name": "New", "slug": "new", "is_active": true}]))
                .unwrap();
        sync_statuses(&store, ChannelId::new(1), &first).await.unwrap();

        let renamed: Vec<SallaStatus> =
            serde_json::from_value(json!([{"id": 1, "name": "Received", "slug": "new", "is_active": false}]))
                .unwrap();
        sync_statuses(&store, ChannelId::new(1), &renamed).await.unwrap();

        let stored = store.store_statuses().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Received");
        assert!(!stored[0].active);
    }
}

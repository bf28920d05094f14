//! Store status catalog sync.

use channel_sync_connector::services::status_catalog;
use channel_sync_core::ChannelId;

use super::Context;

/// Pull the store's order statuses from Salla into `store_statuses`.
///
/// # Errors
///
/// Returns an error if the Salla API is not configured or the sync fails.
pub async fn sync(channel: Option<ChannelId>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::connect(channel).await?;
    let client = ctx
        .state
        .salla()
        .ok_or("Salla API is not configured (set SALLA_CLIENT_ID and SALLA_CLIENT_SECRET)")?;

    let synced = status_catalog::sync_from_salla(client, ctx.state.store(), ctx.channel_id).await?;
    tracing::info!(channel_id = %ctx.channel_id, synced, "Status catalog synced");
    Ok(())
}

//! Order import commands: file import, feed retry and API fetch.

use channel_sync_connector::normalize::normalize_order;
use channel_sync_connector::payload::{PayloadError, SallaOrder, WebhookEnvelope};
use channel_sync_connector::services::ImportOutcome;
use channel_sync_core::ChannelId;

use super::Context;

/// Import an order saved as JSON.
///
/// The file may hold a bare Salla order or a full webhook body.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the import hits
/// a storage failure. Import problems that leave the feed in `error` are
/// reported, not returned.
pub async fn import_file(
    channel: Option<ChannelId>,
    file: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(file).await?;
    let (order, created_at) = parse_order(&bytes)?;

    let ctx = Context::connect(channel).await?;
    let feed = normalize_order(
        &order,
        created_at.as_deref(),
        "file",
        &ctx.state.config().normalizer,
    )?;
    tracing::info!(path = %file, store_id = %feed.store_id, "Importing order from file");

    let outcome = ctx.state.importer().import_feed(ctx.channel_id, &feed).await?;
    report(&feed.store_id, &outcome);
    Ok(())
}

/// Re-run every feed left in `error`, `draft` or `update`.
///
/// # Errors
///
/// Returns an error if the channel does not exist or feeds cannot be listed.
pub async fn retry(channel: Option<ChannelId>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::connect(channel).await?;
    let outcomes = ctx.state.importer().retry_feeds(ctx.channel_id).await?;

    for outcome in &outcomes {
        report(&outcome.feed_id.to_string(), outcome);
    }
    let failed = outcomes.iter().filter(|o| o.sale_order_id.is_none()).count();
    tracing::info!(
        channel_id = %ctx.channel_id,
        retried = outcomes.len(),
        failed,
        "Retry complete"
    );
    Ok(())
}

/// Fetch an order from the Salla API and print its feed, or import it.
///
/// # Errors
///
/// Returns an error if the Salla API is not configured or the request,
/// normalization or import fails.
pub async fn fetch(
    channel: Option<ChannelId>,
    id: &str,
    import: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::connect(channel).await?;
    let client = ctx
        .state
        .salla()
        .ok_or("Salla API is not configured (set SALLA_CLIENT_ID and SALLA_CLIENT_SECRET)")?;

    let order = client.get_order_with_items(id).await?;
    let feed = normalize_order(&order, None, "api", &ctx.state.config().normalizer)?;

    if import {
        let outcome = ctx.state.importer().import_feed(ctx.channel_id, &feed).await?;
        report(&feed.store_id, &outcome);
    } else {
        #[allow(clippy::print_stdout)]
        {
            println!("{}", serde_json::to_string_pretty(&feed)?);
        }
    }
    Ok(())
}

/// Read a bare order or a webhook body carrying one.
fn parse_order(bytes: &[u8]) -> Result<(SallaOrder, Option<String>), PayloadError> {
    match WebhookEnvelope::parse(bytes) {
        Ok(envelope) => Ok((envelope.order()?, envelope.created_at)),
        Err(PayloadError::MissingEvent) => {
            let order = serde_json::from_slice(bytes).map_err(PayloadError::NotJson)?;
            Ok((order, None))
        }
        Err(e) => Err(e),
    }
}

fn report(label: &str, outcome: &ImportOutcome) {
    if outcome.sale_order_id.is_some() {
        tracing::info!(
            order = label,
            feed_id = %outcome.feed_id,
            state = %outcome.state,
            created = outcome.created,
            message = %outcome.message,
            "Order imported"
        );
    } else {
        tracing::warn!(
            order = label,
            feed_id = %outcome.feed_id,
            state = %outcome.state,
            message = %outcome.message,
            "Order import failed"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_order() {
        let (order, created_at) = parse_order(br#"{"id": 42, "reference_id": 1001}"#).unwrap();
        assert_eq!(order.id.as_deref(), Some("42"));
        assert!(created_at.is_none());
    }

    #[test]
    fn test_parse_webhook_body() {
        let body = br#"{"event":"order.created","created_at":"2024-03-01 10:00:00","data":{"id":77}}"#;
        let (order, created_at) = parse_order(body).unwrap();
        assert_eq!(order.id.as_deref(), Some("77"));
        assert_eq!(created_at.as_deref(), Some("2024-03-01 10:00:00"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_order(b"nope"), Err(PayloadError::NotJson(_))));
        assert!(matches!(parse_order(b""), Err(PayloadError::Empty)));
    }
}

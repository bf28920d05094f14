//! CLI command implementations.

pub mod migrate;
pub mod orders;
pub mod seed;
pub mod statuses;

use std::sync::Arc;

use channel_sync_connector::config::ConnectorConfig;
use channel_sync_connector::db::{PgStore, create_pool};
use channel_sync_connector::state::AppState;
use channel_sync_core::ChannelId;

/// Connected state shared by the commands.
pub struct Context {
    pub state: AppState<PgStore>,
    pub channel_id: ChannelId,
}

impl Context {
    /// Load configuration, connect to the database and build the importer.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the database is
    /// unreachable.
    pub async fn connect(channel: Option<ChannelId>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = ConnectorConfig::for_tools()?;
        let channel_id = channel.unwrap_or(config.channel_id);

        let pool = create_pool(&config.database_url).await?;
        tracing::info!("Connected to database");

        let state = AppState::new(config, Arc::new(PgStore::new(pool)))?;
        Ok(Self { state, channel_id })
    }
}

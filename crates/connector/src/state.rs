//! Application state shared across handlers.

use std::sync::Arc;

use channel_sync_core::ChannelKind;
use thiserror::Error;

use crate::config::ConnectorConfig;
use crate::db::Store;
use crate::omniful::{FulfillmentPusher, OmnifulClient, OmnifulError};
use crate::salla::{SallaClient, SallaError, StatusPusher};
use crate::services::{
    ChannelStrategy, OmnifulStrategy, OrderImporter, SallaStrategy, StrategyRegistry,
};

/// Errors building the outbound API clients.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Salla(#[from] SallaError),

    #[error(transparent)]
    Omniful(#[from] OmnifulError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Generic over the store so the router can run
/// against `PgStore` in production and `MemoryStore` in tests.
pub struct AppState<S: Store> {
    inner: Arc<AppStateInner<S>>,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<S: Store> {
    config: ConnectorConfig,
    store: Arc<S>,
    importer: OrderImporter<S>,
    salla: Option<SallaClient>,
}

impl<S: Store> AppState<S> {
    /// Create the state, building the Salla and Omniful clients whose
    /// credentials are set.
    ///
    /// Imported orders are forwarded to Omniful from every channel kind once
    /// it is configured.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if an HTTP client cannot be built.
    pub fn new(config: ConnectorConfig, store: Arc<S>) -> Result<Self, StateError> {
        let salla = config.salla().map(SallaClient::new).transpose()?;
        let pusher = salla
            .clone()
            .map(|client| Arc::new(client) as Arc<dyn StatusPusher>);
        let mut strategies = StrategyRegistry::new()
            .with(ChannelKind::Salla, Arc::new(SallaStrategy::new(pusher)));

        if let Some(omniful) = config.omniful() {
            let client: Arc<dyn FulfillmentPusher> = Arc::new(OmnifulClient::new(omniful)?);
            let strategy = Arc::new(OmnifulStrategy::new(client, omniful.hub_code.clone()));
            strategies = strategies
                .with(ChannelKind::Salla, Arc::clone(&strategy) as Arc<dyn ChannelStrategy>)
                .with(ChannelKind::Omniful, strategy);
        }
        Ok(Self::with_parts(config, store, salla, strategies))
    }

    /// Assemble the state from prepared parts.
    #[must_use]
    pub fn with_parts(
        config: ConnectorConfig,
        store: Arc<S>,
        salla: Option<SallaClient>,
        strategies: StrategyRegistry,
    ) -> Self {
        let importer = OrderImporter::new(Arc::clone(&store), strategies);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                importer,
                salla,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectorConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    #[must_use]
    pub fn importer(&self) -> &OrderImporter<S> {
        &self.inner.importer
    }

    /// Salla API client, when credentials are configured.
    #[must_use]
    pub fn salla(&self) -> Option<&SallaClient> {
        self.inner.salla.as_ref()
    }
}

//! Tax descriptor → internal tax resolution.
//!
//! Lookup order per descriptor: in-process cache, channel tax mapping, an
//! existing tax with the same amount/type/inclusivity (and name, when given),
//! and finally a new tax plus mapping. Concurrent resolutions of the same key
//! within the process share one lookup, and the mapping insert keeps the first
//! writer, so one key never maps to two taxes.

use std::sync::Arc;

use moka::future::Cache;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use channel_sync_core::{TaxDescriptor, TaxId, TaxParseError, parse_tax_list};

use crate::db::{RepositoryError, Store};
use crate::models::{Channel, NewTax, TaxKey, TaxQuery};

const CACHE_CAPACITY: u64 = 10_000;

/// Errors from resolving taxes.
#[derive(Debug, Error)]
pub enum TaxError {
    /// A serialized tax list could not be parsed.
    #[error(transparent)]
    Parse(#[from] TaxParseError),

    /// The store failed during lookup or creation.
    #[error("tax lookup failed: {0}")]
    Store(Arc<RepositoryError>),
}

/// Resolves tax descriptors to tax IDs, caching by [`TaxKey`].
#[derive(Clone)]
pub struct TaxResolver {
    cache: Cache<TaxKey, TaxId>,
}

impl Default for TaxResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::new(CACHE_CAPACITY),
        }
    }

    /// Resolve descriptors to tax IDs, in order and without duplicates.
    ///
    /// An empty result means the caller should fall back to the product's own
    /// taxes.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::Store` if a lookup or insert fails.
    #[instrument(skip(self, store, channel, taxes), fields(channel_id = %channel.id, count = taxes.len()))]
    pub async fn resolve<S: Store + ?Sized>(
        &self,
        store: &S,
        channel: &Channel,
        taxes: &[TaxDescriptor],
    ) -> Result<Vec<TaxId>, TaxError> {
        let mut ids = Vec::with_capacity(taxes.len());
        for tax in taxes.iter().filter(|t| t.rate > Decimal::ZERO) {
            let id = self.resolve_one(store, channel, tax).await?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Resolve a serialized tax list (JSON array or object).
    ///
    /// # Errors
    ///
    /// Returns `TaxError::Parse` if the text is not a JSON list or object.
    pub async fn resolve_raw<S: Store + ?Sized>(
        &self,
        store: &S,
        channel: &Channel,
        raw: &str,
    ) -> Result<Vec<TaxId>, TaxError> {
        let taxes = parse_tax_list(raw)?;
        self.resolve(store, channel, &taxes).await
    }

    async fn resolve_one<S: Store + ?Sized>(
        &self,
        store: &S,
        channel: &Channel,
        tax: &TaxDescriptor,
    ) -> Result<TaxId, TaxError> {
        let inclusive = tax
            .inclusive
            .unwrap_or_else(|| channel.taxes_included_by_default());
        let key = TaxKey::new(channel.id, tax.rate, tax.amount_type, inclusive);

        self.cache
            .try_get_with(key, lookup_or_create(store, channel, tax, key))
            .await
            .map_err(TaxError::Store)
    }

    /// Number of cached keys (after pending maintenance).
    pub async fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

async fn lookup_or_create<S: Store + ?Sized>(
    store: &S,
    channel: &Channel,
    tax: &TaxDescriptor,
    key: TaxKey,
) -> Result<TaxId, RepositoryError> {
    if let Some(id) = store.find_tax_mapping(&key).await? {
        return Ok(id);
    }

    let query = TaxQuery {
        amount: key.rate,
        amount_type: key.amount_type,
        price_include: key.inclusive,
        name: tax.name.clone(),
    };
    let tax_id = match store.find_tax(&query).await? {
        Some(id) => id,
        None => {
            let name = tax
                .name
                .clone()
                .unwrap_or_else(|| format!("{}_{}_{}", channel.kind, channel.id, key.rate));
            let created = store
                .create_tax(&NewTax {
                    name,
                    amount: key.rate,
                    amount_type: key.amount_type,
                    price_include: key.inclusive,
                })
                .await?;
            tracing::info!(tax_id = %created.id, name = %created.name, "Created tax");
            created.id
        }
    };

    store.create_tax_mapping(&key, tax_id).await
}

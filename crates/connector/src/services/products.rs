//! Product events → products and product mappings.
//!
//! A store product maps to one internal product under the [`NO_VARIANTS`] key.
//! Each SKU with option values adds a mapping under its variant key, pointing
//! at the product carrying that SKU's code when one exists, otherwise at the
//! base product.

use tracing::instrument;

use channel_sync_core::{ChannelId, NO_VARIANTS, ProductId};

use crate::db::{RepositoryError, Store};
use crate::models::{NewProduct, Product, ProductMapping};
use crate::normalize::NormalizerConfig;
use crate::payload::{SallaProduct, SallaSku};

/// What a product upsert touched.
#[derive(Debug, Clone)]
pub struct ProductSync {
    pub product: Product,
    pub created: bool,
    /// Variant mappings written.
    pub variants: usize,
}

/// Create or refresh the product for a store product and its mappings.
///
/// Returns `None` for a product without an ID.
///
/// # Errors
///
/// Returns `RepositoryError` if a lookup or write fails.
#[instrument(skip(store, product, config), fields(store_id = ?product.id))]
pub async fn upsert_product<S: Store + ?Sized>(
    store: &S,
    channel_id: ChannelId,
    product: &SallaProduct,
    config: &NormalizerConfig,
) -> Result<Option<ProductSync>, RepositoryError> {
    let Some(store_id) = product.id.as_deref().filter(|id| !id.is_empty()) else {
        tracing::warn!("Product event without an ID");
        return Ok(None);
    };

    let existing = match store
        .find_product_mapping(channel_id, store_id, NO_VARIANTS)
        .await?
    {
        Some(mapping) => store.get_product(mapping.product_id).await?,
        None => match product.sku.as_deref().filter(|s| !s.is_empty()) {
            Some(sku) => store.find_product_by_code(sku).await?,
            None => None,
        },
    };

    let mut fields = NewProduct {
        name: product
            .name
            .clone()
            .unwrap_or_else(|| config.unknown_product.clone()),
        default_code: product.sku.clone().filter(|s| !s.is_empty()),
        barcode: product.gtin.clone().filter(|s| !s.is_empty()),
        list_price: product.list_price(),
        is_service: false,
        tax_ids: Vec::new(),
    };

    let (saved, created) = match existing {
        Some(existing) => {
            // Taxes are managed internally.
            fields.tax_ids = existing.tax_ids;
            (store.update_product(existing.id, &fields).await?, false)
        }
        None => (store.create_product(&fields).await?, true),
    };

    store
        .upsert_product_mapping(&ProductMapping {
            channel_id,
            store_product_id: store_id.to_string(),
            store_variant_id: NO_VARIANTS.to_string(),
            product_id: saved.id,
            default_code: saved.default_code.clone(),
            barcode: saved.barcode.clone(),
        })
        .await?;

    let mut variants = 0;
    for sku in &product.skus {
        let Some(key) = sku.variant_key() else { continue };
        let product_id = variant_product(store, sku).await?.unwrap_or(saved.id);
        store
            .upsert_product_mapping(&ProductMapping {
                channel_id,
                store_product_id: store_id.to_string(),
                store_variant_id: key,
                product_id,
                default_code: sku.sku.clone(),
                barcode: sku.barcode.clone(),
            })
            .await?;
        variants += 1;
    }

    tracing::info!(product_id = %saved.id, created, variants, "Upserted product from product event");
    Ok(Some(ProductSync {
        product: saved,
        created,
        variants,
    }))
}

async fn variant_product<S: Store + ?Sized>(
    store: &S,
    sku: &SallaSku,
) -> Result<Option<ProductId>, RepositoryError> {
    match sku.sku.as_deref().filter(|s| !s.is_empty()) {
        Some(code) => Ok(store.find_product_by_code(code).await?.map(|p| p.id)),
        None => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn salla_product() -> SallaProduct {
        serde_json::from_value(json!({
            "id": 314,
            "name": "Desk Lamp",
            "sku": "LAMP",
            "gtin": "6281000000001",
            "price": {"amount": "149.00", "currency": "SAR"},
            "skus": [
                {"id": 1, "sku": "LAMP-W", "related_option_values": [20, 4]},
                {"id": 2, "sku": "", "related_option_values": [21, 4]},
                {"id": 3, "related_option_values": []}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_creates_product_and_mappings() {
        let store = MemoryStore::new();
        let white = store
            .create_product(&NewProduct {
                name: "Desk Lamp (white)".to_string(),
                default_code: Some("LAMP-W".to_string()),
                ..NewProduct::default()
            })
            .await
            .unwrap();

        let sync = upsert_product(&store, ChannelId::new(1), &salla_product(), &NormalizerConfig::default())
            .await
            .unwrap()
            .unwrap();
        assert!(sync.created);
        assert_eq!(sync.variants, 2);
        assert_eq!(sync.product.list_price, Decimal::from(149));
        assert_eq!(sync.product.barcode.as_deref(), Some("6281000000001"));

        let base = store
            .find_product_mapping(ChannelId::new(1), "314", NO_VARIANTS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(base.product_id, sync.product.id);

        let w = store
            .find_product_mapping(ChannelId::new(1), "314", "4_20")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(w.product_id, white.id);

        let other = store
            .find_product_mapping(ChannelId::new(1), "314", "4_21")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(other.product_id, sync.product.id);
    }

    #[tokio::test]
    async fn test_second_event_updates_and_keeps_taxes() {
        let store = MemoryStore::new();
        let config = NormalizerConfig::default();
        let first = upsert_product(&store, ChannelId::new(1), &salla_product(), &config)
            .await
            .unwrap()
            .unwrap();

        let taxed = NewProduct {
            name: first.product.name.clone(),
            default_code: first.product.default_code.clone(),
            barcode: first.product.barcode.clone(),
            list_price: first.product.list_price,
            is_service: false,
            tax_ids: vec![channel_sync_core::TaxId::new(5)],
        };
        store.update_product(first.product.id, &taxed).await.unwrap();

        let renamed = SallaProduct {
            name: Some("Desk Lamp v2".to_string()),
            ..salla_product()
        };
        let second = upsert_product(&store, ChannelId::new(1), &renamed, &config)
            .await
            .unwrap()
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.product.id, first.product.id);
        assert_eq!(second.product.name, "Desk Lamp v2");
        assert_eq!(second.product.tax_ids, taxed.tax_ids);
        assert_eq!(store.products().await.len(), 1);
    }
}

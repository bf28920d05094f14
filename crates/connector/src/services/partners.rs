//! Customer events → partners.

use tracing::instrument;

use channel_sync_core::ChannelId;

use crate::db::{RepositoryError, Store};
use crate::models::{NewPartner, Partner};
use crate::normalize::NormalizerConfig;
use crate::payload::SallaCustomer;

/// Create or refresh the partner for a store customer.
///
/// Returns `None` for a customer without an ID.
///
/// # Errors
///
/// Returns `RepositoryError` if the upsert fails.
#[instrument(skip(store, customer, config), fields(store_id = ?customer.id))]
pub async fn upsert_customer<S: Store + ?Sized>(
    store: &S,
    channel_id: ChannelId,
    customer: &SallaCustomer,
    config: &NormalizerConfig,
) -> Result<Option<Partner>, RepositoryError> {
    let Some(store_id) = customer.id.clone().filter(|id| !id.is_empty()) else {
        tracing::warn!("Customer event without an ID");
        return Ok(None);
    };

    let partner = store
        .upsert_partner(&new_partner(channel_id, store_id, customer, config))
        .await?;
    tracing::info!(partner_id = %partner.id, "Upserted partner from customer event");
    Ok(Some(partner))
}

fn new_partner(
    channel_id: ChannelId,
    store_id: String,
    customer: &SallaCustomer,
    config: &NormalizerConfig,
) -> NewPartner {
    let or_na = |value: Option<&String>| {
        value
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "N/A".to_string())
    };

    NewPartner {
        channel_id,
        store_id,
        name: customer
            .display_name()
            .unwrap_or_else(|| config.unknown_customer.clone()),
        email: customer.email.clone(),
        phone: customer.invoice_phone().unwrap_or_else(|| "N/A".to_string()),
        street: or_na(customer.location.as_ref()),
        street2: "N/A".to_string(),
        zip: String::new(),
        city: or_na(customer.city.as_ref()),
        country_code: customer
            .country_code
            .clone()
            .unwrap_or_else(|| config.default_country.clone()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_refreshes_existing() {
        let store = MemoryStore::new();
        let config = NormalizerConfig::default();
        let customer: SallaCustomer = serde_json::from_value(json!({
            "id": 77, "first_name": "Omar", "last_name": "Saleh",
            "mobile": "512345678", "mobile_code": "+966", "city": "Jeddah"
        }))
        .unwrap();

        let created = upsert_customer(&store, ChannelId::new(1), &customer, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.name, "Omar Saleh");
        assert_eq!(created.phone, "966512345678");
        assert_eq!(created.street, "N/A");
        assert_eq!(created.country_code, "SA");

        let moved = SallaCustomer {
            city: Some("Riyadh".to_string()),
            ..customer
        };
        let updated = upsert_customer(&store, ChannelId::new(1), &moved, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.city, "Riyadh");
        assert_eq!(store.partners().await.len(), 1);
    }

    #[tokio::test]
    async fn test_customer_without_id_is_skipped() {
        let store = MemoryStore::new();
        let result = upsert_customer(
            &store,
            ChannelId::new(1),
            &SallaCustomer::default(),
            &NormalizerConfig::default(),
        )
        .await
        .unwrap();
        assert!(result.is_none());
        assert!(store.partners().await.is_empty());
    }
}

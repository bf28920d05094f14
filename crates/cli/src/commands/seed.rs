//! Seed channel settings from a YAML file.
//!
//! ```yaml
//! channel:
//!   id: 1
//!   kind: salla
//!   name: My Salla Store
//!   default_tax_type: exclude
//!   tax_on_discount_line: false
//!   use_store_order_name: true
//!   company_currency: SAR
//! order_states:
//!   - store_slug: completed
//!     confirm: true
//!     invoice: true
//!     invoice_paid: true
//!   - store_slug: canceled
//!     cancel: true
//! currencies:
//!   - code: SAR
//! ```
//!
//! Re-running the command updates rows in place.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use channel_sync_connector::config::get_database_url;
use channel_sync_connector::db::catalog::CatalogRepository;
use channel_sync_connector::db::channels::ChannelRepository;
use channel_sync_connector::db::create_pool;
use channel_sync_connector::models::{Channel, ChannelOrderState};
use channel_sync_core::CurrencyCode;

/// Contents of a seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    pub channel: Channel,
    #[serde(default)]
    pub order_states: Vec<OrderStateSeed>,
    #[serde(default)]
    pub currencies: Vec<CurrencySeed>,
}

/// Actions for one store status slug.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct OrderStateSeed {
    pub store_slug: String,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub invoice: bool,
    #[serde(default)]
    pub invoice_paid: bool,
    #[serde(default)]
    pub ship: bool,
    #[serde(default)]
    pub cancel: bool,
    #[serde(default)]
    pub make_payment: bool,
}

impl OrderStateSeed {
    fn into_state(self, channel: &Channel) -> ChannelOrderState {
        ChannelOrderState {
            channel_id: channel.id,
            store_slug: self.store_slug,
            confirm: self.confirm,
            invoice: self.invoice || self.invoice_paid,
            invoice_paid: self.invoice_paid,
            ship: self.ship,
            cancel: self.cancel,
            make_payment: self.make_payment,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurrencySeed {
    pub code: CurrencyCode,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

const fn active_by_default() -> bool {
    true
}

/// Check a seed file for mistakes the database would not catch.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    if seed.channel.name.trim().is_empty() {
        errors.push("channel name is empty".to_string());
    }

    let mut slugs = HashSet::new();
    for state in &seed.order_states {
        if state.store_slug.trim().is_empty() {
            errors.push("order state with an empty store_slug".to_string());
        } else if !slugs.insert(state.store_slug.as_str()) {
            errors.push(format!("duplicate order state: {}", state.store_slug));
        }
        if state.cancel && (state.invoice_paid || state.ship) {
            errors.push(format!(
                "order state {} both cancels and fulfils the order",
                state.store_slug
            ));
        }
    }

    let mut codes = HashSet::new();
    for currency in &seed.currencies {
        if !codes.insert(currency.code) {
            errors.push(format!("duplicate currency: {}", currency.code));
        }
    }

    errors
}

/// Seed a channel from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, fails validation, or the
/// database writes fail.
pub async fn channel(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let database_url = get_database_url("CHANNEL_SYNC_DATABASE_URL")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading channel seed");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = create_pool(&database_url).await?;
    info!("Connected to database");

    let channels = ChannelRepository::new(&pool);
    channels.upsert(&seed.channel).await?;

    let catalog = CatalogRepository::new(&pool);
    for currency in &seed.currencies {
        catalog.upsert_currency(currency.code, currency.active).await?;
    }

    let state_count = seed.order_states.len();
    for state in seed.order_states {
        channels
            .upsert_order_state(&state.into_state(&seed.channel))
            .await?;
    }

    info!("Seeding complete!");
    info!("  Channel: {} ({})", seed.channel.name, seed.channel.id);
    info!("  Order states: {state_count}");
    info!("  Currencies: {}", seed.currencies.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use channel_sync_core::ChannelKind;

    const SEED: &str = r"
channel:
  id: 3
  kind: salla
  name: Riyadh Store
  default_tax_type: include
  tax_on_discount_line: true
  use_store_order_name: false
  order_start_date: 2024-01-01T00:00:00Z
  company_currency: SAR
order_states:
  - store_slug: completed
    confirm: true
    invoice_paid: true
  - store_slug: canceled
    cancel: true
currencies:
  - code: sar
  - code: USD
    active: false
";

    #[test]
    fn test_parses_seed_file() {
        let seed: SeedFile = serde_yaml::from_str(SEED).unwrap();
        assert_eq!(seed.channel.kind, ChannelKind::Salla);
        assert!(seed.channel.order_start_date.is_some());
        assert!(seed.channel.delivery_product_id.is_none());
        assert_eq!(seed.currencies[0].code, CurrencyCode::SAR);
        assert!(seed.currencies[0].active);
        assert!(!seed.currencies[1].active);
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_invoice_paid_implies_invoice() {
        let mut seed: SeedFile = serde_yaml::from_str(SEED).unwrap();
        let channel = seed.channel.clone();
        let state = seed.order_states.remove(0).into_state(&channel);
        assert_eq!(state.channel_id, channel.id);
        assert!(state.invoice);
        assert!(state.invoice_paid);
    }

    #[test]
    fn test_validate_reports_mistakes() {
        let mut seed: SeedFile = serde_yaml::from_str(SEED).unwrap();
        seed.order_states.push(OrderStateSeed {
            store_slug: "completed".to_string(),
            confirm: false,
            invoice: false,
            invoice_paid: true,
            ship: false,
            cancel: true,
            make_payment: false,
        });
        seed.currencies.push(CurrencySeed {
            code: CurrencyCode::SAR,
            active: true,
        });

        let errors = validate(&seed);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("duplicate order state"));
        assert!(errors[1].contains("cancels and fulfils"));
        assert!(errors[2].contains("duplicate currency"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let bad = SEED.replace("cancel: true", "cancle: true");
        assert!(serde_yaml::from_str::<SeedFile>(&bad).is_err());
    }
}

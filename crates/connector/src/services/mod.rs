//! Import pipeline services.
//!
//! Everything here talks to storage through [`crate::db::Store`] and is
//! exercised against `MemoryStore` in tests.

pub mod fulfillment;
pub mod importer;
pub mod partners;
pub mod payment;
pub mod products;
pub mod status_catalog;
pub mod status_sync;
pub mod strategy;
pub mod tax_resolver;

pub use fulfillment::OmnifulStrategy;
pub use importer::{ImportError, ImportOutcome, OrderImporter};
pub use strategy::{ChannelStrategy, HookContext, SallaStrategy, StrategyError, StrategyRegistry};
pub use tax_resolver::{TaxError, TaxResolver};

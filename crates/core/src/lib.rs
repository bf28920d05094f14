//! channel-sync core - shared types.
//!
//! This crate holds the types that flow between the webhook surface, the
//! normalizer and the importer:
//! - typed IDs for internal records (`define_id!`)
//! - money and currency codes
//! - status enums for feeds, orders and line sources
//! - tax descriptors and their lenient parsing
//! - canonical order lines and the normalized order feed
//!
//! # Architecture
//!
//! Only types and pure functions live here. No I/O, no database access and no
//! HTTP clients, so the crate can be used from the connector, the CLI and
//! tests alike.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! Channel sync connector.
//!
//! Receives Salla webhooks, normalizes orders into [`channel_sync_core::OrderFeed`]s
//! and imports them as internal sale orders.
//!
//! # Architecture
//!
//! - [`routes`] - Axum handlers for health checks and the Salla webhook
//! - [`payload`] / [`normalize`] - Salla JSON to canonical order feeds
//! - [`services`] - Feed staging, order upsert, taxes, payments and status hooks
//! - [`db`] - The [`db::Store`] trait with `PostgreSQL` and in-memory backends
//! - [`salla`] - Salla REST client with token refresh
//! - [`omniful`] - Omniful client used to forward imported orders for fulfillment

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod normalize;
pub mod omniful;
pub mod payload;
pub mod routes;
pub mod salla;
pub mod services;
pub mod state;

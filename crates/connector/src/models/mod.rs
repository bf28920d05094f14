//! Domain records the connector reads and writes.
//!
//! These are storage-agnostic: the `db` module converts them to and from
//! table rows, and `db::MemoryStore` keeps them in maps.

pub mod catalog;
pub mod channel;
pub mod feed;
pub mod fulfillment;
pub mod sale_order;
pub mod store_status;

pub use catalog::*;
pub use channel::*;
pub use feed::*;
pub use fulfillment::*;
pub use sale_order::*;
pub use store_status::*;

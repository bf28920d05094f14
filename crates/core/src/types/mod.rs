//! Domain types for order synchronization.

pub mod decimal;
pub mod id;
pub mod line;
pub mod money;
pub mod order;
pub mod status;
pub mod tax;

pub use decimal::{parse_decimal, parse_decimal_str};
pub use id::*;
pub use line::{CanonicalLine, NO_VARIANTS};
pub use money::{CurrencyCode, CurrencyError, Money};
pub use order::{AddressInfo, CustomerInfo, OrderFeed};
pub use status::*;
pub use tax::{TaxAmountType, TaxDescriptor, TaxParseError, parse_tax_list, sorted_rates};

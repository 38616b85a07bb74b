//! ssUSD Price Oracle
//!
//! Provides USD prices for collateral and reserve denoms.
//! Keepers only use the staleness-checked `get_price_dec_safe`; the plain
//! accessor is kept for callers that display prices.

mod error;
mod mock;
mod types;

pub use error::OracleError;
pub use mock::MockOracle;
pub use types::{OracleFeed, Price, StalenessControl, DEFAULT_STALENESS_THRESHOLD_SECS};

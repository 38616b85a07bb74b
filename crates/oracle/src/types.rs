//! Core oracle types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ssusd_core::Denom;

use crate::OracleError;

/// Prices older than this are stale unless a denom overrides it
pub const DEFAULT_STALENESS_THRESHOLD_SECS: u64 = 3600;

/// A USD price posted for a denom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub denom: Denom,
    /// USD per base unit
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
    /// Source of the price (e.g. "mock", "band", "pyth")
    pub source: String,
}

impl Price {
    pub fn new(denom: Denom, amount: Decimal, updated_at: DateTime<Utc>) -> Self {
        Self {
            denom,
            amount,
            updated_at,
            source: "mock".to_string(),
        }
    }

    /// Stale once strictly more than `threshold_secs` have passed
    pub fn is_stale(&self, now: DateTime<Utc>, threshold_secs: u64) -> bool {
        let age = now.signed_duration_since(self.updated_at);
        age.num_seconds() > threshold_secs as i64
    }
}

/// Price feed interface
///
/// Implementations must be deterministic for a given block: keepers call
/// them inline during state transitions.
pub trait OracleFeed: Send + Sync {
    /// Latest posted price, without a freshness check
    fn get_price_dec(&self, denom: &Denom) -> Result<Decimal, OracleError>;

    /// Latest posted price, rejected when older than the staleness threshold at `now`
    fn get_price_dec_safe(&self, denom: &Denom, now: DateTime<Utc>) -> Result<Decimal, OracleError>;
}

/// Feeds whose freshness window is set at runtime by governance
pub trait StalenessControl: Send + Sync {
    fn set_staleness_threshold(&self, denom: Denom, secs: u64);
}

//! Mock Oracle for testing
//!
//! Holds posted prices in memory. Prices are stamped with the time they were
//! posted so staleness can be exercised against block time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use ssusd_core::Denom;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::OracleError;
use crate::types::{OracleFeed, Price, StalenessControl, DEFAULT_STALENESS_THRESHOLD_SECS};

/// Mock price oracle
pub struct MockOracle {
    prices: RwLock<HashMap<Denom, Price>>,
    /// Per-denom staleness overrides, in seconds
    thresholds: RwLock<HashMap<Denom, u64>>,
    default_threshold_secs: u64,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            thresholds: RwLock::new(HashMap::new()),
            default_threshold_secs: DEFAULT_STALENESS_THRESHOLD_SECS,
        }
    }

    /// Use a different default staleness threshold
    pub fn with_default_threshold(mut self, secs: u64) -> Self {
        self.default_threshold_secs = secs;
        self
    }

    /// Post a price for `denom` as of `updated_at`
    pub fn set_price(&self, denom: Denom, amount: Decimal, updated_at: DateTime<Utc>) {
        let price = Price::new(denom.clone(), amount, updated_at);
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.insert(denom, price);
    }

    /// Remove a price (for testing price-not-found handling)
    pub fn remove_price(&self, denom: &Denom) {
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.remove(denom);
    }

    fn threshold_for(&self, denom: &Denom) -> u64 {
        let thresholds = self.thresholds.read().unwrap_or_else(PoisonError::into_inner);
        thresholds
            .get(denom)
            .copied()
            .unwrap_or(self.default_threshold_secs)
    }

    fn price(&self, denom: &Denom) -> Result<Price, OracleError> {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        prices
            .get(denom)
            .cloned()
            .ok_or_else(|| OracleError::PriceNotFound {
                denom: denom.clone(),
            })
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl OracleFeed for MockOracle {
    fn get_price_dec(&self, denom: &Denom) -> Result<Decimal, OracleError> {
        Ok(self.price(denom)?.amount)
    }

    fn get_price_dec_safe(&self, denom: &Denom, now: DateTime<Utc>) -> Result<Decimal, OracleError> {
        let price = self.price(denom)?;
        let threshold_secs = self.threshold_for(denom);
        if price.is_stale(now, threshold_secs) {
            return Err(OracleError::StalePrice {
                denom: denom.clone(),
                last_update: price.updated_at,
                threshold_secs,
            });
        }
        Ok(price.amount)
    }
}

impl StalenessControl for MockOracle {
    fn set_staleness_threshold(&self, denom: Denom, secs: u64) {
        let mut thresholds = self.thresholds.write().unwrap_or_else(PoisonError::into_inner);
        thresholds.insert(denom, secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn atom() -> Denom {
        Denom::new("uatom").unwrap()
    }

    #[test]
    fn test_mock_oracle_set_price() {
        let oracle = MockOracle::new();
        assert!(oracle.get_price_dec(&atom()).is_err());

        oracle.set_price(atom(), dec!(10.5), t0());
        assert_eq!(oracle.get_price_dec(&atom()).unwrap(), dec!(10.5));
        assert_eq!(oracle.get_price_dec_safe(&atom(), t0()).unwrap(), dec!(10.5));
    }

    #[test]
    fn test_mock_oracle_price_not_found() {
        let oracle = MockOracle::new();
        let result = oracle.get_price_dec_safe(&atom(), t0());
        assert!(matches!(result, Err(OracleError::PriceNotFound { .. })));
    }

    #[test]
    fn test_safe_accessor_rejects_stale_price() {
        let oracle = MockOracle::new();
        oracle.set_price(atom(), dec!(10), t0());

        let later = t0() + Duration::seconds(3601);
        // The plain accessor has no freshness check
        assert!(oracle.get_price_dec(&atom()).is_ok());
        let result = oracle.get_price_dec_safe(&atom(), later);
        assert!(matches!(
            result,
            Err(OracleError::StalePrice { threshold_secs: 3600, .. })
        ));
    }

    #[test]
    fn test_per_denom_threshold() {
        let oracle = MockOracle::new().with_default_threshold(60);
        oracle.set_price(atom(), dec!(10), t0());
        assert!(oracle.get_price_dec_safe(&atom(), t0() + Duration::seconds(61)).is_err());

        oracle.set_staleness_threshold(atom(), 120);
        assert!(oracle.get_price_dec_safe(&atom(), t0() + Duration::seconds(61)).is_ok());
    }

    #[test]
    fn test_remove_price() {
        let oracle = MockOracle::new();
        oracle.set_price(atom(), dec!(10), t0());
        oracle.remove_price(&atom());
        assert!(oracle.get_price_dec(&atom()).is_err());
    }
}

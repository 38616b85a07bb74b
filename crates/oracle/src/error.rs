//! Oracle error types

use chrono::{DateTime, Utc};
use ssusd_core::Denom;
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// No price has been posted for the denom
    #[error("Price not found: {denom}")]
    PriceNotFound { denom: Denom },

    /// Price data is older than the denom's staleness threshold
    #[error("Stale price for {denom}: last update was {last_update}, threshold is {threshold_secs}s")]
    StalePrice {
        denom: Denom,
        last_update: DateTime<Utc>,
        threshold_secs: u64,
    },
}

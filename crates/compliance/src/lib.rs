//! ssUSD Compliance Gate
//!
//! Identity clearance consulted inline by the vault and reserve keepers:
//! - `ComplianceGate`: the interface keepers depend on
//! - `ProfileRegistry`: in-memory profiles keyed by address
//! - `ComplianceConfig`: blocked jurisdictions and unknown-address policy

pub mod config;
pub mod error;
pub mod profile;
pub mod registry;

pub use config::{ComplianceConfig, FailPolicy};
pub use error::{ComplianceError, ComplianceResult};
pub use profile::{ComplianceProfile, KycLevel, ProfileStatus, RiskLevel};
pub use registry::ProfileRegistry;

use chrono::{DateTime, Utc};
use ssusd_core::{Address, Coin};

/// Identity clearance interface
pub trait ComplianceGate: Send + Sync {
    /// Address is known, not sanctioned, not blocked and not expired at `now`
    fn assert_compliant(&self, addr: &Address, now: DateTime<Utc>) -> ComplianceResult<()>;

    /// `assert_compliant` plus spending limits for `coin`
    fn assert_compliant_for_amount(
        &self,
        addr: &Address,
        coin: &Coin,
        now: DateTime<Utc>,
    ) -> ComplianceResult<()>;
}

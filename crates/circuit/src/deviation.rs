//! Per-denom oracle tolerances
//!
//! Governance keeps one record per price feed. The staleness window is the
//! part applied today: the app pushes it into the oracle after genesis and
//! after every update.

use serde::{Deserialize, Serialize};
use ssusd_core::{Authority, Denom, Governance};
use ssusd_store::Context;
use tracing::info;

use crate::error::{CircuitError, CircuitResult};
use crate::keeper::CircuitBreaker;
use crate::keys::{ORACLE_DEVIATION, STORE_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleDeviationConfig {
    pub denom: Denom,
    /// Largest move between two consecutive updates
    pub max_deviation_bps: u64,
    /// Largest move within a day
    pub max_daily_deviation_bps: u64,
    /// Prices older than this are rejected
    pub staleness_threshold_secs: u64,
    pub min_update_interval_secs: u64,
}

impl OracleDeviationConfig {
    pub fn new(
        denom: Denom,
        max_deviation_bps: u64,
        max_daily_deviation_bps: u64,
        staleness_threshold_secs: u64,
        min_update_interval_secs: u64,
    ) -> Self {
        Self {
            denom,
            max_deviation_bps,
            max_daily_deviation_bps,
            staleness_threshold_secs,
            min_update_interval_secs,
        }
    }

    pub fn validate(&self) -> CircuitResult<()> {
        let fail = |detail: &str| {
            Err(CircuitError::InvalidParams(format!(
                "oracle config {}: {detail}",
                self.denom
            )))
        };
        if self.max_deviation_bps == 0 {
            return fail("max deviation must be positive");
        }
        if self.max_daily_deviation_bps < self.max_deviation_bps {
            return fail("daily deviation below per-update deviation");
        }
        if self.staleness_threshold_secs == 0 {
            return fail("staleness threshold must be positive");
        }
        if self.min_update_interval_secs > self.staleness_threshold_secs {
            return fail("update interval longer than staleness threshold");
        }
        Ok(())
    }
}

/// Volatile collateral is allowed wider moves than stable reserve feeds
pub fn default_oracle_deviation_configs() -> Vec<OracleDeviationConfig> {
    vec![
        OracleDeviationConfig::new(Denom::from_static("uatom"), 500, 2_000, 3_600, 60),
        OracleDeviationConfig::new(Denom::from_static("uusdc"), 100, 200, 3_600, 60),
    ]
}

impl CircuitBreaker {
    pub fn oracle_deviation_config(
        &self,
        ctx: &Context,
        denom: &Denom,
    ) -> CircuitResult<Option<OracleDeviationConfig>> {
        Ok(ctx.get(&STORE_KEY.str_key(ORACLE_DEVIATION, denom.as_str()))?)
    }

    /// Every stored config, ordered by denom
    pub fn oracle_deviation_configs(&self, ctx: &Context) -> CircuitResult<Vec<OracleDeviationConfig>> {
        Ok(ctx.scan_values(&STORE_KEY.key(ORACLE_DEVIATION))?)
    }

    /// Insert or replace the config of `config.denom`
    pub fn set_oracle_deviation_config(
        &self,
        ctx: &mut Context,
        authority: &Authority<Governance>,
        config: OracleDeviationConfig,
    ) -> CircuitResult<()> {
        config.validate()?;
        self.save_oracle_deviation_config(ctx, &config)?;
        info!(
            authority = %authority.address(),
            denom = %config.denom,
            max_deviation_bps = config.max_deviation_bps,
            staleness_threshold_secs = config.staleness_threshold_secs,
            "oracle deviation config updated"
        );
        Ok(())
    }

    pub(crate) fn save_oracle_deviation_config(
        &self,
        ctx: &mut Context,
        config: &OracleDeviationConfig,
    ) -> CircuitResult<()> {
        ctx.set(&STORE_KEY.str_key(ORACLE_DEVIATION, config.denom.as_str()), config)?;
        Ok(())
    }
}

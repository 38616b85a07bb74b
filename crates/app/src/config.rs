//! App configuration
//!
//! Loaded from JSON; everything but the governance address falls back to
//! the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};
use ssusd_circuit::{CircuitGenesis, CircuitParams};
use ssusd_compliance::ComplianceConfig;
use ssusd_core::Address;
use ssusd_oracle::DEFAULT_STALENESS_THRESHOLD_SECS;
use ssusd_stablecoin::{GenesisState, ReserveParams, VaultParams};

use crate::error::{AppError, AppResult};
use crate::genesis::AppGenesis;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Governance authority of every module
    pub governance: Address,

    /// Default oracle staleness window for the in-memory oracle
    #[serde(default = "default_oracle_staleness")]
    pub oracle_staleness_secs: u64,

    #[serde(default)]
    pub compliance: ComplianceConfig,

    // === Initial params ===
    #[serde(default)]
    pub vault_params: VaultParams,

    #[serde(default)]
    pub reserve_params: ReserveParams,

    #[serde(default)]
    pub circuit_params: CircuitParams,
}

fn default_oracle_staleness() -> u64 {
    DEFAULT_STALENESS_THRESHOLD_SECS
}

impl AppConfig {
    pub fn new(governance: Address) -> Self {
        Self {
            governance,
            oracle_staleness_secs: default_oracle_staleness(),
            compliance: ComplianceConfig::default(),
            vault_params: VaultParams::default(),
            reserve_params: ReserveParams::default(),
            circuit_params: CircuitParams::default(),
        }
    }

    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.oracle_staleness_secs == 0 {
            return Err(AppError::Config(
                "oracle staleness window must be positive".to_string(),
            ));
        }
        self.compliance
            .validate()
            .map_err(|err| AppError::Config(err.to_string()))?;
        self.vault_params.validate()?;
        self.reserve_params.validate()?;
        self.circuit_params.validate()?;
        Ok(())
    }

    /// Genesis with the configured params and no entities
    pub fn genesis(&self) -> AppGenesis {
        AppGenesis {
            stablecoin: GenesisState {
                vault_params: self.vault_params.clone(),
                reserve_params: self.reserve_params.clone(),
                ..GenesisState::default()
            },
            circuit: CircuitGenesis {
                params: self.circuit_params.clone(),
                ..CircuitGenesis::default()
            },
        }
    }
}

//! Genesis import/export for the circuit module

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ssusd_store::Context;
use tracing::info;

use crate::deviation::{default_oracle_deviation_configs, OracleDeviationConfig};
use crate::error::{CircuitError, CircuitResult};
use crate::keeper::CircuitBreaker;
use crate::params::CircuitParams;
use crate::state::{CircuitStatus, GlobalPauseState, LiquidationSurgeProtection, ModuleCircuitState, RateLimitState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitGenesis {
    #[serde(default)]
    pub params: CircuitParams,
    #[serde(default)]
    pub global_state: GlobalPauseState,
    #[serde(default)]
    pub module_circuits: Vec<ModuleCircuitState>,
    #[serde(default)]
    pub rate_limit_states: Vec<RateLimitState>,
    #[serde(default)]
    pub liquidation_protection: LiquidationSurgeProtection,
    #[serde(default = "default_oracle_deviation_configs")]
    pub oracle_deviation_configs: Vec<OracleDeviationConfig>,
}

impl Default for CircuitGenesis {
    fn default() -> Self {
        Self {
            params: CircuitParams::default(),
            global_state: GlobalPauseState::default(),
            module_circuits: Vec::new(),
            rate_limit_states: Vec::new(),
            liquidation_protection: LiquidationSurgeProtection::default(),
            oracle_deviation_configs: default_oracle_deviation_configs(),
        }
    }
}

impl CircuitGenesis {
    pub fn validate(&self) -> CircuitResult<()> {
        self.params.validate()?;

        if self.global_state.paused && self.global_state.paused_by.is_none() {
            return Err(invalid("paused without a pausing authority".to_string()));
        }

        let mut modules = HashSet::new();
        for circuit in &self.module_circuits {
            if circuit.module_name.is_empty() {
                return Err(invalid("module circuit without a name".to_string()));
            }
            if !modules.insert(circuit.module_name.as_str()) {
                return Err(invalid(format!("duplicate circuit for {}", circuit.module_name)));
            }
            if circuit.failure_threshold == 0 {
                return Err(invalid(format!(
                    "circuit {} has a zero failure threshold",
                    circuit.module_name
                )));
            }
            if circuit.status == CircuitStatus::Open && circuit.tripped_by.is_none() {
                return Err(invalid(format!(
                    "open circuit {} has no trip source",
                    circuit.module_name
                )));
            }
        }

        let mut keys = HashSet::new();
        for state in &self.rate_limit_states {
            let name = state.key.split(':').next().unwrap_or_default();
            if self.params.rate_limit(name).is_none() {
                return Err(invalid(format!("rate limit state {} has no config", state.key)));
            }
            if !keys.insert(state.key.as_str()) {
                return Err(invalid(format!("duplicate rate limit state {}", state.key)));
            }
        }

        if self.liquidation_protection.max_per_block == 0 {
            return Err(invalid("max liquidations per block must be positive".to_string()));
        }

        let mut denoms = HashSet::new();
        for config in &self.oracle_deviation_configs {
            config.validate()?;
            if !denoms.insert(&config.denom) {
                return Err(invalid(format!("duplicate oracle config for {}", config.denom)));
            }
        }
        Ok(())
    }

    pub fn export(ctx: &Context, breaker: &CircuitBreaker) -> CircuitResult<Self> {
        Ok(Self {
            params: breaker.params(ctx)?,
            global_state: breaker.global_state(ctx)?,
            module_circuits: breaker.module_circuits(ctx)?,
            rate_limit_states: breaker.rate_limit_states(ctx)?,
            liquidation_protection: breaker.liquidation_protection(ctx)?,
            oracle_deviation_configs: breaker.oracle_deviation_configs(ctx)?,
        })
    }

    pub fn init(&self, ctx: &mut Context, breaker: &CircuitBreaker) -> CircuitResult<()> {
        self.validate()?;

        breaker.store_params(ctx, &self.params)?;
        breaker.save_global_state(ctx, &self.global_state)?;
        for circuit in &self.module_circuits {
            breaker.save_module_circuit(ctx, circuit)?;
        }
        for state in &self.rate_limit_states {
            breaker.save_rate_limit_state(ctx, state)?;
        }
        breaker.save_liquidation_protection(ctx, &self.liquidation_protection)?;
        for config in &self.oracle_deviation_configs {
            breaker.save_oracle_deviation_config(ctx, config)?;
        }

        info!(
            paused = self.global_state.paused,
            circuits = self.module_circuits.len(),
            rate_limit_states = self.rate_limit_states.len(),
            oracle_configs = self.oracle_deviation_configs.len(),
            "circuit genesis initialized"
        );
        Ok(())
    }
}

fn invalid(detail: String) -> CircuitError {
    CircuitError::InvalidGenesis(detail)
}

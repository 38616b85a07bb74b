//! Circuit breaker parameters

use serde::{Deserialize, Serialize};
use ssusd_core::Address;
use std::collections::HashSet;

use crate::error::{CircuitError, CircuitResult};

pub const MSG_MINT_STABLECOIN: &str = "/ssusd.stablecoin.v1.MsgMintStablecoin";
pub const MSG_DEPOSIT_RESERVE: &str = "/ssusd.stablecoin.v1.MsgDepositReserve";
pub const MSG_INSTANT_TRANSFER: &str = "/ssusd.settlement.v1.MsgInstantTransfer";

/// Fixed-window request limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub name: String,
    pub max_requests: u64,
    pub window_seconds: u64,
    /// Count per sender instead of chain-wide
    #[serde(default)]
    pub per_address: bool,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Message type URLs covered; empty covers every message
    #[serde(default)]
    pub message_types: Vec<String>,
}

fn enabled() -> bool {
    true
}

impl RateLimitConfig {
    pub fn new(name: &str, max_requests: u64, window_seconds: u64, per_address: bool) -> Self {
        Self {
            name: name.to_string(),
            max_requests,
            window_seconds,
            per_address,
            enabled: true,
            message_types: Vec::new(),
        }
    }

    pub fn for_messages(mut self, message_types: &[&str]) -> Self {
        self.message_types = message_types.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn applies_to(&self, msg_type: &str) -> bool {
        self.enabled
            && (self.message_types.is_empty() || self.message_types.iter().any(|m| m == msg_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitParams {
    /// Addresses besides governance that may act as circuit operators
    #[serde(default)]
    pub authorities: Vec<Address>,
    #[serde(default = "default_failure_threshold")]
    pub default_failure_threshold: u64,
    #[serde(default = "default_recovery_period")]
    pub default_recovery_period_secs: u64,
    #[serde(default = "default_max_pause")]
    pub max_pause_duration_secs: u64,
    #[serde(default = "default_rate_limits")]
    pub rate_limits: Vec<RateLimitConfig>,
}

fn default_failure_threshold() -> u64 {
    5
}

fn default_recovery_period() -> u64 {
    300
}

fn default_max_pause() -> u64 {
    86_400
}

fn default_rate_limits() -> Vec<RateLimitConfig> {
    vec![
        RateLimitConfig::new("global_tx", 1_000, 60, false),
        RateLimitConfig::new("per_address_tx", 100, 60, true),
        RateLimitConfig::new("stablecoin_mint", 10, 60, true)
            .for_messages(&[MSG_MINT_STABLECOIN, MSG_DEPOSIT_RESERVE]),
        RateLimitConfig::new("large_settlement", 5, 300, true).for_messages(&[MSG_INSTANT_TRANSFER]),
    ]
}

impl Default for CircuitParams {
    fn default() -> Self {
        Self {
            authorities: Vec::new(),
            default_failure_threshold: default_failure_threshold(),
            default_recovery_period_secs: default_recovery_period(),
            max_pause_duration_secs: default_max_pause(),
            rate_limits: default_rate_limits(),
        }
    }
}

impl CircuitParams {
    pub fn validate(&self) -> CircuitResult<()> {
        if self.default_failure_threshold == 0 {
            return Err(CircuitError::InvalidParams(
                "failure threshold must be positive".to_string(),
            ));
        }
        if self.default_recovery_period_secs == 0 {
            return Err(CircuitError::InvalidParams(
                "recovery period must be positive".to_string(),
            ));
        }
        if self.max_pause_duration_secs == 0 {
            return Err(CircuitError::InvalidParams(
                "max pause duration must be positive".to_string(),
            ));
        }
        let mut names = HashSet::new();
        for limit in &self.rate_limits {
            if limit.name.is_empty() || limit.name.contains(':') {
                return Err(CircuitError::InvalidParams(format!(
                    "invalid rate limit name '{}'",
                    limit.name
                )));
            }
            if !names.insert(limit.name.as_str()) {
                return Err(CircuitError::InvalidParams(format!(
                    "duplicate rate limit {}",
                    limit.name
                )));
            }
            if limit.window_seconds == 0 {
                return Err(CircuitError::InvalidParams(format!(
                    "rate limit {} needs a positive window",
                    limit.name
                )));
            }
        }
        Ok(())
    }

    pub fn rate_limit(&self, name: &str) -> Option<&RateLimitConfig> {
        self.rate_limits.iter().find(|l| l.name == name)
    }
}

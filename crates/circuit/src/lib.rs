//! ssUSD Circuit Breaker
//!
//! Systemic brakes applied before any stablecoin message executes:
//! - global pause, optionally self-expiring
//! - per-module circuits, tripped by operators or by repeated collaborator failures
//! - fixed-window rate limits, chain-wide or per sender
//! - liquidation surge protection per block
//! - per-denom oracle tolerances, including the staleness window

pub mod deviation;
pub mod error;
pub mod genesis;
pub mod keeper;
pub mod keys;
pub mod params;
pub mod rate_limit;
pub mod state;
pub mod surge;

pub use deviation::{default_oracle_deviation_configs, OracleDeviationConfig};
pub use error::{CircuitError, CircuitResult};
pub use genesis::CircuitGenesis;
pub use keeper::CircuitBreaker;
pub use params::{CircuitParams, RateLimitConfig};
pub use rate_limit::bucket_key;
pub use state::{
    CircuitStatus, GlobalPauseState, LiquidationSurgeProtection, ModuleCircuitState,
    RateLimitState, TripSource,
};

pub const MODULE_NAME: &str = "circuit";

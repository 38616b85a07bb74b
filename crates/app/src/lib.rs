//! ssUSD App - message routing and block hooks
//!
//! `App` owns the store and the keepers. Stablecoin messages pass the
//! circuit breaker before they run; every message runs in a store branch
//! committed only on success. `begin_block` sweeps circuit expiries and runs
//! the solvency monitor.

pub mod app;
pub mod config;
pub mod error;
pub mod genesis;
pub mod msgs;

pub use app::{App, BlockResult, InMemoryServices, Keepers, TxResult};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use genesis::AppGenesis;
pub use msgs::{Msg, MsgResponse};

//! ssUSD Core - Domain types
//!
//! This crate contains the fundamental types shared by every ssUSD module:
//! - `Amount`: Non-negative integral amount of base units
//! - `Denom` / `Coin` / `Coins`: Denominated amounts
//! - `Address`: Account address
//! - `Authority`: Typed capability proving a caller was authorized
//! - `Event`: Structured events emitted by state transitions
//! - `ErrorKind`: Stable error categories shared by all module errors

pub mod address;
pub mod amount;
pub mod auth;
pub mod coin;
pub mod denom;
pub mod event;
pub mod kind;

pub use address::{Address, AddressError};
pub use amount::{Amount, AmountError};
pub use auth::{AuthError, Authority, AuthorityGuard, CircuitOperator, Governance, Scope};
pub use coin::{Coin, Coins, CoinsError};
pub use denom::{Denom, DenomError, STABLECOIN_DENOM};
pub use event::Event;
pub use kind::ErrorKind;

/// Basis points in one whole (100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

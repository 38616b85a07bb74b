//! ssUSD Stablecoin module
//!
//! Two issuance paths for ssUSD:
//! - `VaultEngine`: collateralized debt positions minted against crypto collateral,
//!   liquidated outright or through a Dutch auction
//! - `ReserveEngine`: 1:1 issuance (less haircut and fee) against tokenized
//!   treasuries, with a redemption queue and proof-of-reserve attestations
//!
//! `SolvencyMonitor` runs every block and latches the reserve path shut when
//! backing falls below the critical ratio. `invariants` and `genesis` cover
//! both engines.

pub mod attestation;
pub mod auction;
pub mod collab;
pub mod error;
pub mod genesis;
pub mod invariants;
pub mod keys;
pub mod params;
pub mod redemption;
pub mod reserve;
pub mod solvency;
#[cfg(test)]
mod testing;
pub mod types;
pub mod vault;

pub use attestation::{AttestationReport, ChainError};
pub use collab::Collaborators;
pub use error::{StablecoinError, StablecoinResult};
pub use genesis::GenesisState;
pub use params::{
    AuctionParams, CollateralParam, ReserveAssetType, ReserveParams, TokenizedTreasuryConfig,
    VaultParams,
};
pub use reserve::ReserveEngine;
pub use solvency::{SolvencyCheck, SolvencyMonitor, CRITICAL_RESERVE_RATIO_BPS};
pub use types::{
    AuctionStatus, BidFill, DailyStats, DepositStatus, DutchAuction, OffChainAttestation,
    RedemptionRequest, RedemptionStatus, Reserve, ReserveDeposit, Vault,
};
pub use vault::VaultEngine;

/// Module account holding collateral and reserve assets; mints and burns ssUSD
pub const MODULE_NAME: &str = "stablecoin";

/// Reserve ratio reported when nothing has been minted
pub const FULLY_BACKED_BPS: u32 = 10_000;

/// Upper bound of the reported reserve ratio
pub const MAX_RESERVE_RATIO_BPS: u32 = 100_000;

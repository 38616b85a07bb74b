//! Stablecoin module errors

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use ssusd_compliance::ComplianceError;
use ssusd_core::{Address, Amount, AmountError, AuthError, CoinsError, Denom, ErrorKind};
use ssusd_ledger::LedgerError;
use ssusd_oracle::OracleError;
use ssusd_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StablecoinError {
    // === Validation ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid denom: expected {expected}, got {actual}")]
    DenomMismatch { expected: Denom, actual: Denom },

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Invalid attestation: {0}")]
    InvalidAttestation(String),

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    // === Authorization ===
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Attester not approved: {0}")]
    AttesterNotApproved(Address),

    // === Domain rules ===
    #[error("Collateral type not supported: {0}")]
    UnsupportedCollateral(Denom),

    #[error("Collateral type inactive: {0}")]
    CollateralInactive(Denom),

    #[error("Vault minting is disabled")]
    MintingDisabled,

    #[error("Vault {vault_id} under-collateralized: collateral value {collateral_value} < required {required}")]
    UnderCollateralized {
        vault_id: u64,
        collateral_value: Decimal,
        required: Decimal,
    },

    #[error("Debt limit exceeded for {denom}: {requested} > limit {limit}")]
    DebtLimitExceeded {
        denom: Denom,
        requested: Amount,
        limit: Amount,
    },

    #[error("Vault {0} is healthy and cannot be liquidated")]
    VaultHealthy(u64),

    #[error("Invalid price for {denom}: {price}")]
    InvalidPrice { denom: Denom, price: Decimal },

    #[error("Reserve minting is paused")]
    MintPaused,

    #[error("Reserve redemption is paused")]
    RedeemPaused,

    #[error("Reserve asset not approved: {0}")]
    AssetNotApproved(Denom),

    #[error("{what} {amount} below minimum {minimum}")]
    BelowMinimum {
        what: &'static str,
        amount: Amount,
        minimum: Amount,
    },

    /// e.g. `daily limit exceeded: used X + Y > limit Z`
    #[error("{0}")]
    DailyLimitExceeded(String),

    #[error("Allocation limit for {denom} exceeded: {allocation_bps} bps > max {max_bps} bps")]
    AllocationExceeded {
        denom: Denom,
        allocation_bps: Decimal,
        max_bps: u32,
    },

    #[error("Insufficient reserves of {denom}: {available} available, {required} required")]
    InsufficientReserves {
        denom: Denom,
        available: Amount,
        required: Amount,
    },

    #[error("Redemption {id} is {status}, expected pending")]
    RedemptionNotPending { id: u64, status: String },

    #[error("Dutch auctions are disabled")]
    AuctionsDisabled,

    #[error("Auction {id} is {status}, expected active")]
    AuctionNotActive { id: u64, status: String },

    #[error("Redemption {id} not executable until {executable_after}")]
    RedemptionNotReady {
        id: u64,
        executable_after: DateTime<Utc>,
    },

    // === Not found ===
    #[error("Vault not found: {0}")]
    VaultNotFound(u64),

    #[error("Redemption request not found: {0}")]
    RedemptionNotFound(u64),

    #[error("Reserve deposit not found: {0}")]
    DepositNotFound(u64),

    #[error("Attestation not found: {0}")]
    AttestationNotFound(u64),

    #[error("Auction not found: {0}")]
    AuctionNotFound(u64),

    // === Collaborators ===
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // === Internal ===
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Coins(#[from] CoinsError),

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Invariant {name} broken: {detail}")]
    InvariantBroken { name: &'static str, detail: String },
}

impl StablecoinError {
    pub fn kind(&self) -> ErrorKind {
        use StablecoinError::*;
        match self {
            InvalidAmount(_)
            | DenomMismatch { .. }
            | InvalidParams(_)
            | InvalidAttestation(_)
            | InvalidGenesis(_) => ErrorKind::Validation,

            Unauthorized(_) | Auth(_) | AttesterNotApproved(_) => ErrorKind::Unauthorized,

            UnsupportedCollateral(_)
            | CollateralInactive(_)
            | MintingDisabled
            | UnderCollateralized { .. }
            | DebtLimitExceeded { .. }
            | VaultHealthy(_)
            | InvalidPrice { .. }
            | MintPaused
            | RedeemPaused
            | AssetNotApproved(_)
            | BelowMinimum { .. }
            | DailyLimitExceeded(_)
            | AllocationExceeded { .. }
            | InsufficientReserves { .. }
            | RedemptionNotPending { .. }
            | RedemptionNotReady { .. }
            | AuctionsDisabled
            | AuctionNotActive { .. } => ErrorKind::DomainRule,

            VaultNotFound(_)
            | RedemptionNotFound(_)
            | DepositNotFound(_)
            | AttestationNotFound(_)
            | AuctionNotFound(_) => ErrorKind::NotFound,

            Oracle(_) => ErrorKind::Collaborator,
            Compliance(err) => err.kind(),
            Ledger(err) => err.kind(),

            Store(_) | Amount(_) | Coins(_) | Overflow(_) | InvariantBroken { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Failure of an external dependency rather than of the request itself
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            StablecoinError::Oracle(_) | StablecoinError::Store(_) | StablecoinError::Overflow(_)
        ) || matches!(self, StablecoinError::Ledger(err) if err.kind() == ErrorKind::Collaborator)
    }
}

pub type StablecoinResult<T> = Result<T, StablecoinError>;

//! ssUSD Ledger - the only path through which balances move
//!
//! # Key Types
//! - `LedgerService`: transfer/mint/burn primitives used by the keepers
//! - `AccountId`: user or module account
//! - `MemLedger`: in-memory implementation with module permissions

pub mod account;
pub mod error;
pub mod memory;

pub use account::{AccountId, ModulePermission};
pub use error::LedgerError;
pub use memory::MemLedger;

use ssusd_core::{Address, Amount, Coin, Denom};

/// Bank primitives. Each call is all-or-nothing.
pub trait LedgerService: Send + Sync {
    fn send_coins_from_account_to_module(
        &self,
        from: &Address,
        module: &str,
        coins: &[Coin],
    ) -> Result<(), LedgerError>;

    fn send_coins_from_module_to_account(
        &self,
        module: &str,
        to: &Address,
        coins: &[Coin],
    ) -> Result<(), LedgerError>;

    /// Mint into the module account; the module needs the minter permission
    fn mint_coins(&self, module: &str, coins: &[Coin]) -> Result<(), LedgerError>;

    /// Burn from the module account; the module needs the burner permission
    fn burn_coins(&self, module: &str, coins: &[Coin]) -> Result<(), LedgerError>;

    fn get_supply(&self, denom: &Denom) -> Amount;

    /// Read-only balance lookup used to validate before transferring
    fn balance(&self, account: &AccountId, denom: &Denom) -> Amount;
}

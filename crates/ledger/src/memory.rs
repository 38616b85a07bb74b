//! In-memory ledger
//!
//! Every call validates against a snapshot of the touched balances before
//! writing, so a failed call leaves no partial transfer behind.

use ssusd_core::{Address, Amount, Coin, Coins, CoinsError, Denom};
use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::account::{AccountId, ModulePermission};
use crate::error::LedgerError;
use crate::LedgerService;

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<AccountId, Coins>,
    supply: Coins,
    modules: HashMap<String, BTreeSet<ModulePermission>>,
}

impl LedgerState {
    fn require_module(&self, module: &str) -> Result<&BTreeSet<ModulePermission>, LedgerError> {
        self.modules
            .get(module)
            .ok_or_else(|| LedgerError::UnknownModule(module.to_string()))
    }

    fn require_permission(&self, module: &str, permission: ModulePermission) -> Result<(), LedgerError> {
        if self.require_module(module)?.contains(&permission) {
            Ok(())
        } else {
            Err(LedgerError::MissingPermission {
                module: module.to_string(),
                permission: permission.to_string(),
            })
        }
    }

    /// Debit `coins` from `account`, all or nothing
    fn debit(&mut self, account: &AccountId, coins: &[Coin]) -> Result<(), LedgerError> {
        let mut updated = self.balances.get(account).cloned().unwrap_or_default();
        for coin in coins {
            updated.sub(coin).map_err(|err| match err {
                CoinsError::Insufficient {
                    denom,
                    available,
                    required,
                } => LedgerError::InsufficientFunds {
                    account: account.to_string(),
                    denom,
                    available,
                    required,
                },
                CoinsError::Overflow(denom) => LedgerError::Overflow(denom),
            })?;
        }
        self.balances.insert(account.clone(), updated);
        Ok(())
    }

    fn credit(&mut self, account: &AccountId, coins: &[Coin]) -> Result<(), LedgerError> {
        let mut updated = self.balances.get(account).cloned().unwrap_or_default();
        for coin in coins {
            updated
                .add(coin)
                .map_err(|_| LedgerError::Overflow(coin.denom.clone()))?;
        }
        self.balances.insert(account.clone(), updated);
        Ok(())
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, coins: &[Coin]) -> Result<(), LedgerError> {
        let snapshot = (
            self.balances.get(from).cloned(),
            self.balances.get(to).cloned(),
        );
        self.debit(from, coins)?;
        if let Err(err) = self.credit(to, coins) {
            // restore the debit
            match snapshot.0 {
                Some(balance) => self.balances.insert(from.clone(), balance),
                None => self.balances.remove(from),
            };
            match snapshot.1 {
                Some(balance) => self.balances.insert(to.clone(), balance),
                None => self.balances.remove(to),
            };
            return Err(err);
        }
        Ok(())
    }
}

/// In-memory `LedgerService`
#[derive(Debug, Default)]
pub struct MemLedger {
    state: RwLock<LedgerState>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module account with its supply permissions
    pub fn with_module(self, name: &str, permissions: &[ModulePermission]) -> Self {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state
                .modules
                .insert(name.to_string(), permissions.iter().copied().collect());
        }
        self
    }

    /// Credit a user account out of thin air, increasing supply (genesis funding)
    pub fn fund(&self, to: &Address, coin: Coin) -> Result<(), LedgerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut supply = state.supply.clone();
        supply
            .add(&coin)
            .map_err(|_| LedgerError::Overflow(coin.denom.clone()))?;
        state.credit(&AccountId::from(to), std::slice::from_ref(&coin))?;
        state.supply = supply;
        Ok(())
    }

    /// Plain transfer between two user accounts
    pub fn send_coins(&self, from: &Address, to: &Address, coins: &[Coin]) -> Result<(), LedgerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.transfer(&AccountId::from(from), &AccountId::from(to), coins)?;
        debug!(from = %from, to = %to, coins = coins.len(), "account transfer");
        Ok(())
    }

    pub fn balances(&self, account: &AccountId) -> Coins {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.balances.get(account).cloned().unwrap_or_default()
    }
}

impl LedgerService for MemLedger {
    fn send_coins_from_account_to_module(
        &self,
        from: &Address,
        module: &str,
        coins: &[Coin],
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.require_module(module)?;
        state.transfer(&AccountId::from(from), &AccountId::module(module), coins)?;
        debug!(from = %from, module, coins = coins.len(), "account to module transfer");
        Ok(())
    }

    fn send_coins_from_module_to_account(
        &self,
        module: &str,
        to: &Address,
        coins: &[Coin],
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.require_module(module)?;
        state.transfer(&AccountId::module(module), &AccountId::from(to), coins)?;
        debug!(module, to = %to, coins = coins.len(), "module to account transfer");
        Ok(())
    }

    fn mint_coins(&self, module: &str, coins: &[Coin]) -> Result<(), LedgerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.require_permission(module, ModulePermission::Minter)?;

        let mut supply = state.supply.clone();
        for coin in coins {
            supply
                .add(coin)
                .map_err(|_| LedgerError::Overflow(coin.denom.clone()))?;
        }
        state.credit(&AccountId::module(module), coins)?;
        state.supply = supply;
        Ok(())
    }

    fn burn_coins(&self, module: &str, coins: &[Coin]) -> Result<(), LedgerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.require_permission(module, ModulePermission::Burner)?;

        let mut supply = state.supply.clone();
        for coin in coins {
            supply
                .sub(coin)
                .map_err(|_| LedgerError::Overflow(coin.denom.clone()))?;
        }
        state.debit(&AccountId::module(module), coins)?;
        state.supply = supply;
        Ok(())
    }

    fn get_supply(&self, denom: &Denom) -> Amount {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.supply.amount_of(denom)
    }

    fn balance(&self, account: &AccountId, denom: &Denom) -> Amount {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .balances
            .get(account)
            .map(|coins| coins.amount_of(denom))
            .unwrap_or(Amount::ZERO)
    }
}

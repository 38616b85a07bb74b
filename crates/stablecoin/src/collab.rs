//! External services the engines consult inline

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use ssusd_compliance::ComplianceGate;
use ssusd_core::{Address, Amount, Coin, Denom};
use ssusd_ledger::{AccountId, LedgerService};
use ssusd_oracle::{OracleError, OracleFeed};
use std::sync::Arc;
use tracing::debug;

use crate::error::{StablecoinError, StablecoinResult};
use crate::params::TokenizedTreasuryConfig;
use crate::MODULE_NAME;

/// Handles to the oracle, compliance gate and ledger
#[derive(Clone)]
pub struct Collaborators {
    pub oracle: Arc<dyn OracleFeed>,
    pub compliance: Arc<dyn ComplianceGate>,
    pub ledger: Arc<dyn LedgerService>,
}

impl Collaborators {
    pub fn new(
        oracle: Arc<dyn OracleFeed>,
        compliance: Arc<dyn ComplianceGate>,
        ledger: Arc<dyn LedgerService>,
    ) -> Self {
        Self {
            oracle,
            compliance,
            ledger,
        }
    }

    /// Staleness-checked price; a non-positive price is rejected
    pub(crate) fn price(&self, denom: &Denom, now: DateTime<Utc>) -> StablecoinResult<Decimal> {
        let price = self.oracle.get_price_dec_safe(denom, now)?;
        if price <= Decimal::ZERO {
            return Err(StablecoinError::InvalidPrice {
                denom: denom.clone(),
                price,
            });
        }
        Ok(price)
    }

    /// Price of a reserve asset; cash falls back to 1.0 when the feed has none
    pub(crate) fn reserve_price(
        &self,
        config: &TokenizedTreasuryConfig,
        now: DateTime<Utc>,
    ) -> StablecoinResult<Decimal> {
        match self.price(&config.oracle_denom, now) {
            Err(StablecoinError::Oracle(OracleError::PriceNotFound { .. })) if config.is_cash() => {
                debug!(denom = %config.denom, "no feed for cash reserve, using 1.0");
                Ok(Decimal::ONE)
            }
            other => other,
        }
    }

    pub(crate) fn module_balance(&self, denom: &Denom) -> Amount {
        self.ledger.balance(&AccountId::module(MODULE_NAME), denom)
    }

    /// Fail before any transfer when `addr` cannot cover `coin`
    pub(crate) fn ensure_balance(&self, addr: &Address, coin: &Coin) -> StablecoinResult<()> {
        let available = self.ledger.balance(&AccountId::from(addr), &coin.denom);
        if available < coin.amount {
            return Err(ssusd_ledger::LedgerError::InsufficientFunds {
                account: addr.to_string(),
                denom: coin.denom.clone(),
                available,
                required: coin.amount,
            }
            .into());
        }
        Ok(())
    }

    /// Mint ssUSD into the module account and forward it to `to`
    pub(crate) fn mint_to(&self, to: &Address, amount: Amount) -> StablecoinResult<()> {
        let coins = [Coin::stablecoin(amount)];
        self.ledger.mint_coins(MODULE_NAME, &coins)?;
        self.ledger
            .send_coins_from_module_to_account(MODULE_NAME, to, &coins)?;
        Ok(())
    }

    /// Pull ssUSD from `from` into the module account and burn it
    pub(crate) fn burn_from(&self, from: &Address, amount: Amount) -> StablecoinResult<()> {
        let coins = [Coin::stablecoin(amount)];
        self.ledger
            .send_coins_from_account_to_module(from, MODULE_NAME, &coins)?;
        self.ledger.burn_coins(MODULE_NAME, &coins)?;
        Ok(())
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

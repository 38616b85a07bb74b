//! Coin and Coins - denominated amounts

use crate::amount::Amount;
use crate::denom::Denom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinsError {
    #[error("Insufficient {denom}: have {available}, need {required}")]
    Insufficient {
        denom: Denom,
        available: Amount,
        required: Amount,
    },

    #[error("Amount overflow for {0}")]
    Overflow(Denom),
}

/// A single denominated amount
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: Denom,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: Denom, amount: Amount) -> Self {
        Self { denom, amount }
    }

    /// A coin of the ssUSD stablecoin
    pub fn stablecoin(amount: Amount) -> Self {
        Self::new(Denom::stablecoin(), amount)
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A multi-denom balance. Zero entries are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(BTreeMap<Denom, Amount>);

impl Coins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount held of `denom` (zero if absent)
    pub fn amount_of(&self, denom: &Denom) -> Amount {
        self.0.get(denom).copied().unwrap_or(Amount::ZERO)
    }

    pub fn add(&mut self, coin: &Coin) -> Result<(), CoinsError> {
        if coin.is_zero() {
            return Ok(());
        }
        let current = self.amount_of(&coin.denom);
        let updated = current
            .checked_add(&coin.amount)
            .ok_or_else(|| CoinsError::Overflow(coin.denom.clone()))?;
        self.0.insert(coin.denom.clone(), updated);
        Ok(())
    }

    pub fn sub(&mut self, coin: &Coin) -> Result<(), CoinsError> {
        let current = self.amount_of(&coin.denom);
        let updated = current
            .checked_sub(&coin.amount)
            .ok_or_else(|| CoinsError::Insufficient {
                denom: coin.denom.clone(),
                available: current,
                required: coin.amount,
            })?;
        if updated.is_zero() {
            self.0.remove(&coin.denom);
        } else {
            self.0.insert(coin.denom.clone(), updated);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0
            .iter()
            .map(|(denom, amount)| Coin::new(denom.clone(), *amount))
    }
}

//! Amount - Non-negative integral amount of base units
//!
//! Every on-chain quantity (collateral, debt, reserve balances) is counted in
//! whole base units of its denom. Fractional values only appear in prices and
//! ratios, and are truncated back into an `Amount` at the conversion boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when working with amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Amount must be a whole number of base units: {0}")]
    FractionalAmount(Decimal),

    #[error("Invalid amount: {0}")]
    Parse(String),
}

/// A non-negative whole number of base units.
///
/// # Invariant
/// The inner value is always >= 0 and has no fractional part.
///
/// # Example
/// ```
/// use ssusd_core::Amount;
/// use rust_decimal::Decimal;
///
/// let amount = Amount::new(Decimal::new(100, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(100, 0));
///
/// // Negative and fractional amounts are rejected
/// assert!(Amount::new(Decimal::new(-100, 0)).is_err());
/// assert!(Amount::new(Decimal::new(15, 1)).is_err());
///
/// // Conversions from prices truncate
/// let usd = Amount::truncate(Decimal::new(9999, 1)).unwrap();
/// assert_eq!(usd, Amount::from(999u64));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount from a Decimal.
    ///
    /// Returns an error if the value is negative or fractional.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            Err(AmountError::NegativeAmount(value))
        } else if value.fract() != Decimal::ZERO {
            Err(AmountError::FractionalAmount(value))
        } else {
            Ok(Self(value.normalize()))
        }
    }

    /// Truncate a decimal (e.g. a USD conversion) towards zero.
    pub fn truncate(value: Decimal) -> Result<Self, AmountError> {
        Self::new(value.trunc())
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check if the amount is strictly positive
    #[inline]
    pub fn is_positive(&self) -> bool {
        !self.is_zero()
    }

    /// Checked addition - returns None on overflow
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction - returns None if result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        let result = self.0.checked_sub(other.0)?;
        if result < Decimal::ZERO {
            None
        } else {
            Some(Amount(result))
        }
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or(Amount::ZERO)
    }

    /// Scale by `(10000 - bps) / 10000`, truncating. Used for fees and haircuts.
    ///
    /// The whole multiples of 10000 are scaled separately from the remainder,
    /// so no intermediate exceeds the amount itself.
    pub fn less_bps(&self, bps: u32) -> Option<Amount> {
        let denominator = Decimal::from(crate::BPS_DENOMINATOR);
        let keep = Decimal::from(crate::BPS_DENOMINATOR.saturating_sub(bps));
        let rem = self.0.checked_rem(denominator)?;
        let whole = self.0.checked_sub(rem)?.checked_div(denominator)?;
        let scaled = whole
            .checked_mul(keep)?
            .checked_add(rem.checked_mul(keep)?.checked_div(denominator)?.trunc())?;
        Some(Amount(scaled.trunc().normalize()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s).map_err(|e| AmountError::Parse(e.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

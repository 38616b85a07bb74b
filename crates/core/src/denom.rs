//! Denom - Validated coin denomination
//!
//! Follows the usual chain denom grammar: a leading letter followed by
//! 2-127 characters from `[A-Za-z0-9/:._-]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Base denom of the ssUSD stablecoin
pub const STABLECOIN_DENOM: &str = "ussusd";

/// Errors that can occur when parsing denoms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DenomError {
    #[error("Empty denom")]
    Empty,

    #[error("Denom length must be 3-128 chars: {0}")]
    InvalidLength(String),

    #[error("Invalid denom format: {0}")]
    InvalidFormat(String),
}

/// A validated denomination such as `uatom` or `ibc/27394F...`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Denom(String);

impl Denom {
    /// Parse and validate a denom
    pub fn new(value: impl Into<String>) -> Result<Self, DenomError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DenomError::Empty);
        }
        if value.len() < 3 || value.len() > 128 {
            return Err(DenomError::InvalidLength(value));
        }

        let mut chars = value.chars();
        let leading_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
        if !leading_letter || !rest_ok {
            return Err(DenomError::InvalidFormat(value));
        }

        Ok(Self(value))
    }

    /// Denom from a literal known to be valid, for built-in defaults
    pub fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid static denom {value}");
        Self(value.to_string())
    }

    /// The ssUSD stablecoin denom
    pub fn stablecoin() -> Self {
        Self(STABLECOIN_DENOM.to_string())
    }

    /// Returns true for the ssUSD stablecoin denom
    pub fn is_stablecoin(&self) -> bool {
        self.0 == STABLECOIN_DENOM
    }

    /// Returns the denom as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Denom {
    type Err = DenomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Denom {
    type Error = DenomError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Denom> for String {
    fn from(denom: Denom) -> Self {
        denom.0
    }
}

impl AsRef<str> for Denom {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

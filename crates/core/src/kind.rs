//! Stable error categories
//!
//! Every module error maps onto one `ErrorKind` so callers can branch on the
//! category without matching module-specific variants.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input: bad address, denom, zero amount, invalid params
    Validation,
    /// Wrong owner or missing authority
    Unauthorized,
    /// A protocol rule rejected the operation (under-collateralized, limits, ...)
    DomainRule,
    /// Referenced entity does not exist
    NotFound,
    /// Global pause, open circuit, rate limit or liquidation surge
    SystemHalt,
    /// Failure reported by the oracle, compliance gate or ledger
    Collaborator,
    /// Storage or encoding failure
    Internal,
}

impl ErrorKind {
    /// System halts are transient; the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::SystemHalt)
    }
}

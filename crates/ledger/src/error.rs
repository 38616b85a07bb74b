//! Ledger errors

use ssusd_core::{Amount, Denom, ErrorKind};
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds in {account}: {available}{denom} available, {required}{denom} required")]
    InsufficientFunds {
        account: String,
        denom: Denom,
        available: Amount,
        required: Amount,
    },

    #[error("Unknown module account: {0}")]
    UnknownModule(String),

    #[error("Module {module} lacks {permission} permission")]
    MissingPermission { module: String, permission: String },

    #[error("Supply overflow for {0}")]
    Overflow(Denom),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InsufficientFunds { .. } => ErrorKind::DomainRule,
            LedgerError::UnknownModule(_)
            | LedgerError::MissingPermission { .. }
            | LedgerError::Overflow(_) => ErrorKind::Collaborator,
        }
    }
}

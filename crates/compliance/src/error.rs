//! Compliance errors

use chrono::{DateTime, Utc};
use ssusd_core::{Address, ErrorKind};
use thiserror::Error;

/// Errors from the compliance gate
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("Compliance profile not found: {0}")]
    ProfileNotFound(Address),

    #[error("Address is sanctioned: {0}")]
    Sanctioned(Address),

    #[error("Address {address} is blocked from transacting: {reason}")]
    Blocked { address: Address, reason: String },

    #[error("Compliance verification for {address} expired at {expired_at}")]
    ProfileExpired {
        address: Address,
        expired_at: DateTime<Utc>,
    },

    #[error("Enhanced KYC required for high-risk profile {0}")]
    EnhancedDueDiligenceRequired(Address),

    /// e.g. `daily limit exceeded: used 900 + 200 > limit 1000`
    #[error("{0}")]
    LimitExceeded(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl ComplianceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComplianceError::ProfileNotFound(_) => ErrorKind::NotFound,
            ComplianceError::Sanctioned(_)
            | ComplianceError::Blocked { .. }
            | ComplianceError::ProfileExpired { .. }
            | ComplianceError::EnhancedDueDiligenceRequired(_) => ErrorKind::Unauthorized,
            ComplianceError::LimitExceeded(_) => ErrorKind::DomainRule,
            ComplianceError::ConfigError(_) => ErrorKind::Validation,
            ComplianceError::IoError(_) | ComplianceError::SerdeError(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for compliance operations
pub type ComplianceResult<T> = Result<T, ComplianceError>;

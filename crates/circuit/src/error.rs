//! Circuit breaker errors

use chrono::{DateTime, Utc};
use ssusd_core::{Amount, AuthError, ErrorKind};
use ssusd_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CircuitError {
    // === System halts ===
    #[error("System is globally paused: {reason}")]
    GlobalPause {
        reason: String,
        auto_resume_at: Option<DateTime<Utc>>,
    },

    #[error("Circuit open for {module}: {msg_type} is disabled")]
    CircuitOpen { module: String, msg_type: String },

    #[error("Rate limit {name} exceeded: {max_requests} requests per {window_seconds}s")]
    RateLimitExceeded {
        name: String,
        max_requests: u64,
        window_seconds: u64,
    },

    #[error("Liquidation surge protection: {0}")]
    LiquidationSurge(String),

    // === State transitions ===
    #[error("System is already paused")]
    AlreadyPaused,

    #[error("System is not paused")]
    NotPaused,

    #[error("Module circuit not found: {0}")]
    ModuleNotFound(String),

    // === Validation ===
    #[error("Invalid pause duration: {requested}s exceeds max {max}s")]
    InvalidDuration { requested: u64, max: u64 },

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("Invalid liquidation value: {0}")]
    InvalidValue(Amount),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CircuitError {
    pub fn kind(&self) -> ErrorKind {
        use CircuitError::*;
        match self {
            GlobalPause { .. } | CircuitOpen { .. } | RateLimitExceeded { .. } | LiquidationSurge(_) => {
                ErrorKind::SystemHalt
            }
            AlreadyPaused | NotPaused => ErrorKind::DomainRule,
            ModuleNotFound(_) => ErrorKind::NotFound,
            InvalidDuration { .. } | InvalidParams(_) | InvalidGenesis(_) | InvalidValue(_) => {
                ErrorKind::Validation
            }
            Auth(_) => ErrorKind::Unauthorized,
            Store(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

pub type CircuitResult<T> = Result<T, CircuitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halts_are_retryable() {
        let err = CircuitError::RateLimitExceeded {
            name: "global_tx".to_string(),
            max_requests: 1000,
            window_seconds: 60,
        };
        assert_eq!(err.kind(), ErrorKind::SystemHalt);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Rate limit global_tx exceeded: 1000 requests per 60s");

        assert!(!CircuitError::AlreadyPaused.is_retryable());
        assert_eq!(
            CircuitError::ModuleNotFound("stablecoin".into()).kind(),
            ErrorKind::NotFound
        );
    }
}

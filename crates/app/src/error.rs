//! App errors

use ssusd_circuit::CircuitError;
use ssusd_core::{AuthError, ErrorKind};
use ssusd_stablecoin::StablecoinError;
use ssusd_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Stablecoin(#[from] StablecoinError),

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Block {height} does not follow block {current}")]
    InvalidBlock { height: u64, current: u64 },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Stablecoin(err) => err.kind(),
            AppError::Circuit(err) => err.kind(),
            AppError::Auth(_) => ErrorKind::Unauthorized,
            AppError::InvalidBlock { .. } | AppError::Config(_) => ErrorKind::Validation,
            AppError::Store(_) | AppError::Io(_) | AppError::Json(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// A collaborator failure rather than a rejected request
    pub fn is_systemic(&self) -> bool {
        matches!(self, AppError::Stablecoin(err) if err.is_systemic())
    }
}

pub type AppResult<T> = Result<T, AppError>;

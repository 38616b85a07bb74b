//! Store errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt key: {0}")]
    CorruptKey(String),

    #[error("Invalid snapshot line {line}: {reason}")]
    InvalidSnapshot { line: usize, reason: String },
}

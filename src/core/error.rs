use crate::transaction::TransactionToken;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    /// Operation invoked on the wrong element variant.
    #[error("Not allowed operation: {0}")]
    Usage(String),

    #[error("Transaction conflict: node is already owned by {0}")]
    TransactionConflict(TransactionToken),

    #[error("No transaction to {0}")]
    NoActiveTransaction(&'static str),

    #[error("Transaction {0} belongs to another thread")]
    NotTransactionOwner(TransactionToken),

    /// Only raised under `BoundsPolicy::Strict`.
    #[error("Index {index} out of range for list of length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("Timed out after {0:?} waiting for a node owned by another transaction")]
    LockTimeout(Duration),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;

impl TreeError {
    /// True for errors a caller may reasonably retry after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TreeError::TransactionConflict(_) | TreeError::LockTimeout(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for TreeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

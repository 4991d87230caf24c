//! Workflow error model.

use thiserror::Error;

/// Result type used across the workflow core.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors surfaced by the withdrawal workflow and the inventory ledger.
///
/// Every variant is returned to the caller verbatim; nothing is recovered
/// locally except a bounded optimistic retry on `Conflict` inside the
/// service layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// A reservation asked for more stock than the product holds.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// The referenced product, request or user does not exist.
    #[error("not found")]
    NotFound,

    /// A transition was attempted on a request that is not pending.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A value failed validation (e.g. non-positive quantity, empty name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An optimistic concurrency check failed and retries were exhausted.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage layer failed; any partial mutation was rolled back.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl WorkflowError {
    pub fn insufficient_stock(requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

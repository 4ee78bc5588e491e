//! Error types for store operations.

use crate::checkout::CheckoutRejection;
use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by the persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    // ═══════════════════════════════════════════════════════════════════════
    // Business Conflicts
    // ═══════════════════════════════════════════════════════════════════════
    /// A uniqueness constraint was violated (duplicate email, title,
    /// review, discounted book, ...).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A record changed between read and write (optimistic concurrency).
    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    /// A checkout precondition failed while the store held its locks.
    #[error("Checkout rejected: {0}")]
    CheckoutRejected(CheckoutRejection),

    // ═══════════════════════════════════════════════════════════════════════
    // Infrastructure Errors
    // ═══════════════════════════════════════════════════════════════════════
    /// Database connection or query failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored value could not be converted into a domain type.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<CheckoutRejection> for StoreError {
    fn from(rejection: CheckoutRejection) -> Self {
        Self::CheckoutRejected(rejection)
    }
}

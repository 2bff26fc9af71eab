//! Error types shared between the domain and its adapters.
//!
//! Ports return `DomainError` so the domain never sees sqlx types. The
//! webhook layer re-classifies these into its own retryable taxonomy;
//! here the code only says which layer failed.

use std::fmt;
use thiserror::Error;

/// Coarse classification of a domain-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Persistence failure: query error, connection loss, constraint
    /// violation. The message carries the driver's wording.
    DatabaseError,

    /// A stored value this service wrote can no longer be interpreted,
    /// e.g. a status column outside the known vocabulary.
    DataCorruption,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::DataCorruption => "DATA_CORRUPTION",
        };
        write!(f, "{}", s)
    }
}

/// Domain error carrying a classification code and a human-readable message.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A document store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for document store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Document does not exist (for operations that require an existing one).
    #[display("document not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Path has the wrong shape or contains invalid segments.
    #[display("invalid path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// The store cannot be reached right now.
    #[display("document store unavailable")]
    Unavailable,
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// Document contents could not be encoded or decoded.
    #[display("invalid document data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::Database)
    }
}

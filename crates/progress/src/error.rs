//! Progress Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Store failures are raised into one
//! of these kinds so the store's own error stays in the tree as a child.

use derive_more::{Display, Error};

/// A progress-tracking error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for progress-tracking operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading from the document store failed.
    #[display("document store error")]
    Store,
    /// A completion or like could not be saved; the local change was rolled back.
    #[display("failed to save change; local state was restored")]
    RemoteWrite,
    /// Creating the year's month records did not produce any.
    #[display("failed to initialize plan data for {_0}")]
    InitializationFailed(#[error(not(source))] String),
    /// A user or plan id cannot be used as a document key.
    #[display("invalid key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// A stored record could not be decoded, or a value could not be encoded.
    #[display("invalid progress data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// Progress can only be recorded for the current year.
    #[display("cannot record progress for {_0}; only the current year can be changed")]
    OutsideCurrentYear(#[error(not(source))] i32),
    /// Reading or writing a cache snapshot failed.
    #[display("cache snapshot error")]
    Snapshot,
    /// Sign-in did not produce a credential.
    #[display("sign-in failed")]
    Identity,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store | Self::RemoteWrite | Self::Snapshot)
    }
}

//! Bible Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A reference data error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for reference data operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending input.
        value: String,
    },
    /// A scripture range violates `1 <= start <= end`.
    #[display("invalid chapter range: {start}-{end}")]
    InvalidRange { start: u32, end: u32 },
    /// No plan is registered under the requested identifier.
    #[display("reading plan not found: {_0}")]
    PlanNotFound(#[error(not(source))] String),
    /// Embedded reference data is missing from the binary.
    #[display("embedded asset not found: {_0}")]
    AssetNotFound(#[error(not(source))] String),
    /// Reference data could not be decoded.
    #[display("invalid reference data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Reference data is either valid or it isn't.
        false
    }
}

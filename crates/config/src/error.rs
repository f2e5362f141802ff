//! Config Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration file was named explicitly but does not exist.
    #[display("configuration file not found: {_0}")]
    FileNotFound(#[error(not(source))] String),
    /// The merged configuration could not be deserialized.
    #[display("failed to parse configuration")]
    Parse,
    /// A value was parsed but is not usable.
    #[display("invalid configuration value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Configuration has to be fixed by the user.
        false
    }
}

//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    MissingFile(#[error(not(source))] PathBuf),
    /// The configuration sources could not be merged into a valid shape
    /// (syntax errors, wrong types).
    #[display("could not load configuration")]
    Load,
    /// A value is out of range or inconsistent.
    #[display("invalid configuration value for '{key}': {reason}")]
    Invalid {
        key: &'static str,
        #[error(not(source))]
        reason: String,
    },
    /// The article cache was configured to hold no entries.
    #[display("cache capacity must be at least 1")]
    CapacityMisconfigured,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Configuration has to be fixed by a human before another attempt.
        false
    }
}

//! Index Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The index source could not be opened or read.
    #[display("index source is unreadable")]
    Io,
    /// The index source is not a valid stream in its compression format.
    #[display("index source failed to decompress")]
    Decompression,
    /// A single line did not hold `offset:id:title`. Counted, never fatal.
    #[display("malformed index line {line}: {reason}")]
    MalformedLine {
        /// One-based line number within the source.
        line: u64,
        #[error(not(source))]
        reason: &'static str,
    },
    /// A load was requested on an index that has already started one.
    #[display("index is already loading or loaded")]
    AlreadyLoading,
    /// Background loading needs a Tokio runtime to schedule onto.
    #[display("no async runtime available to load the index")]
    NoRuntime,
    /// The background load panicked or was cancelled with the runtime.
    #[display("index load was aborted")]
    Aborted,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }

    /// Categorise a failure to read from the (possibly compressed) source.
    pub(crate) fn from_io(e: &std::io::Error) -> Self {
        match offwiki_compress::error::ErrorKind::from_io(e) {
            offwiki_compress::error::ErrorKind::Io => ErrorKind::Io,
            _ => ErrorKind::Decompression,
        }
    }
}

/// Raise a read failure under the matching category.
pub(crate) fn raise_io(e: std::io::Error) -> Error {
    let kind = ErrorKind::from_io(&e);
    exn::Exn::from(e).raise(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        let malformed = ErrorKind::MalformedLine { line: 7, reason: "missing title" };
        assert_eq!(malformed.to_string(), "malformed index line 7: missing title");
        assert_eq!(ErrorKind::AlreadyLoading.to_string(), "index is already loading or loaded");
    }

    #[test]
    fn error_kind_from_io() {
        use std::io::{Error as IoError, ErrorKind as IoKind};
        assert_eq!(ErrorKind::from_io(&IoError::new(IoKind::InvalidData, "bad block")), ErrorKind::Decompression);
        assert_eq!(ErrorKind::from_io(&IoError::new(IoKind::NotFound, "gone")), ErrorKind::Io);
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::Decompression.is_retryable());
    }
}

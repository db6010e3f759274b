//! Compression Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A compression error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for compression operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Failed to initialize an encoder/decoder for requested compression format.
    Encoder,
    /// Data is corrupt or malformed. Don't retry with the same input.
    #[display("invalid or corrupted data")]
    InvalidData,
    /// Decompressed output exceeded the caller's limit.
    #[display("decompressed data exceeds {_0} bytes")]
    TooLarge(#[error(not(source))] u64),
    /// The requested byte range does not describe a readable block.
    #[display("block range {_0} is empty or outside the file")]
    OutOfBounds(#[error(not(source))] String),
    /// The requested format is not supported (for this operation).
    #[display("unsupported format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The requested format is supported but not enabled.
    #[display("disabled format: {_0}")]
    DisabledFormat(#[error(not(source))] String),
    /// An I/O operation on the underlying file failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }

    /// Categorise an I/O error surfaced by a decoder.
    ///
    /// Decoders report malformed input through [`std::io::Error`] as well, so
    /// the error kind is the only way to tell a bad stream from a bad disk.
    pub fn from_io(e: &std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::InvalidInput
            | std::io::ErrorKind::InvalidData
            | std::io::ErrorKind::UnexpectedEof
            // xz2 and zstd report stream errors as `Other`.
            | std::io::ErrorKind::Other => ErrorKind::InvalidData,
            _ => ErrorKind::Io,
        }
    }

    /// Returns `true` if the error describes bad input rather than a failure
    /// to access it.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, ErrorKind::InvalidData | ErrorKind::TooLarge(_) | ErrorKind::OutOfBounds(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidData.to_string(), "invalid or corrupted data");
        assert_eq!(ErrorKind::UnsupportedFormat("lz4".to_string()).to_string(), "unsupported format: lz4");
        assert_eq!(ErrorKind::TooLarge(1024).to_string(), "decompressed data exceeds 1024 bytes");
        assert_eq!(ErrorKind::Io.to_string(), "I/O error");
    }

    #[test]
    fn error_kind_classification() {
        assert!(!ErrorKind::InvalidData.is_retryable());
        assert!(ErrorKind::InvalidData.is_corrupt());
        assert!(ErrorKind::OutOfBounds("[5, 5)".to_string()).is_corrupt());
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::Io.is_corrupt());
    }

    #[test]
    fn error_kind_from_io() {
        use std::io::{Error as IoError, ErrorKind as IoKind};
        assert_eq!(ErrorKind::from_io(&IoError::new(IoKind::InvalidInput, "bad magic")), ErrorKind::InvalidData);
        assert_eq!(ErrorKind::from_io(&IoError::new(IoKind::UnexpectedEof, "truncated")), ErrorKind::InvalidData);
        assert_eq!(ErrorKind::from_io(&IoError::new(IoKind::PermissionDenied, "denied")), ErrorKind::Io);
    }

    #[test]
    fn error_from_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));
        let err: Result<()> = result.or_raise(|| ErrorKind::Io);
        let exn = err.unwrap_err();
        // Exn<E> implements Deref<Target = E>
        assert_eq!(*exn, ErrorKind::Io);
    }
}

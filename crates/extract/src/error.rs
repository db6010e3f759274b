//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use offwiki_compress::BlockRange;
use offwiki_compress::error::{Error as CompressionError, ErrorKind as CompressionErrorKind};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive could not be opened or read.
    #[display("archive is unreadable")]
    Io,
    /// The block failed to decompress or does not hold well-formed page
    /// records. Other blocks are unaffected.
    #[display("corrupt block {_0}")]
    CorruptBlock(#[error(not(source))] BlockRange),
    /// The block decompressed to more than the configured limit.
    #[display("block {range} decompresses to more than {limit} bytes")]
    BlockTooLarge {
        #[error(not(source))]
        range: BlockRange,
        limit: u64,
    },
    /// The block is intact but holds no matching page.
    #[display("no matching page in block")]
    NotFound,
    /// A page record inside a block is malformed. Always raised beneath a
    /// [`CorruptBlock`](Self::CorruptBlock).
    #[display("malformed page record: {_0}")]
    MalformedRecord(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The bytes on disk don't change between attempts; only access can.
        matches!(self, ErrorKind::Io)
    }

    /// Returns `true` for failures confined to one block's contents.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, ErrorKind::CorruptBlock(_) | ErrorKind::BlockTooLarge { .. } | ErrorKind::MalformedRecord(_))
    }

    /// Convert a block read failure into an extraction error, keeping the
    /// compress crate's error tree as a child.
    #[track_caller]
    pub fn block_read(err: CompressionError, range: BlockRange) -> Error {
        let kind = match &*err {
            CompressionErrorKind::Io => ErrorKind::Io,
            CompressionErrorKind::TooLarge(limit) => ErrorKind::BlockTooLarge { range, limit: *limit },
            _ => ErrorKind::CorruptBlock(range),
        };
        err.raise(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CompressionErrorKind::Io, ErrorKind::Io)]
    #[case(CompressionErrorKind::InvalidData, ErrorKind::CorruptBlock(BlockRange::new(100, 250)))]
    #[case(CompressionErrorKind::OutOfBounds("[100, 250)".to_string()), ErrorKind::CorruptBlock(BlockRange::new(100, 250)))]
    #[case(CompressionErrorKind::TooLarge(64), ErrorKind::BlockTooLarge { range: BlockRange::new(100, 250), limit: 64 })]
    fn test_block_read_mapping(#[case] from: CompressionErrorKind, #[case] expected: ErrorKind) {
        let err = ErrorKind::block_read(exn::Exn::from(from), BlockRange::new(100, 250));
        assert_eq!(*err, expected);
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::CorruptBlock(BlockRange::new(100, 250)).to_string(), "corrupt block [100, 250)");
        let too_large = ErrorKind::BlockTooLarge { range: BlockRange::new(250, None), limit: 8 };
        assert_eq!(too_large.to_string(), "block [250, EOF) decompresses to more than 8 bytes");
    }
}

//! Decompression with automatic format detection, plus random access into
//! multistream containers.
//!
//! This crate wraps several compression libraries behind a unified
//! [`Compression`] enum, providing:
//!
//! - **Format detection** from file extensions ([`Compression::from_path`]) or
//!   magic bytes ([`Compression::from_magic_bytes`])
//! - **Streaming** decoders for line-oriented sources ([`Compression::wrap_reader`],
//!   [`Compression::wrap_multi_reader`])
//! - **Block reads** from multistream archives ([`Compression::read_block`]):
//!   seek to a member's starting offset and decode exactly that one member
//! - **Block writes** via [`MultistreamWriter`], which concatenates
//!   independently compressed members and reports where each one starts
//!
//! Bzip2 and Gzip are always available. Optional formats (XZ, Zstd) are
//! behind feature flags and only support whole-stream decoding.

mod construct;
pub mod error;
mod multistream;
mod ops;
mod util;

pub use crate::construct::MAGIC_LEN;
pub use crate::multistream::{BlockRange, MultistreamWriter};

/// A supported compression format.
///
/// Variants gated behind feature flags (`xz`, `zstd`) are only available when
/// the corresponding feature is enabled. Defaults to [`None`](Self::None)
/// (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// Gzip compression (.gz)
    Gzip,
    /// XZ/LZMA compression (.xz)
    #[cfg(feature = "xz")]
    Xz,
    /// Zstd compression (.zst)
    #[cfg(feature = "zstd")]
    Zstd,
}

#[cfg(test)]
mod tests {
    use crate::Compression;

    #[test]
    fn compression_default() {
        assert_eq!(Compression::default(), Compression::None);
    }
}

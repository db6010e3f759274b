//! Compression Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{
    Compression as BzCompression,
    read::{BzDecoder, MultiBzDecoder},
    write::BzEncoder,
};
use exn::ResultExt;
use flate2::{
    Compression as GzCompression,
    read::{GzDecoder, MultiGzDecoder},
    write::GzEncoder,
};
use std::io::{Read, Write};
use tracing::instrument;
#[cfg(feature = "xz")]
use xz2::{read::XzDecoder, write::XzEncoder};
#[cfg(feature = "zstd")]
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

// Dumps are written once and read many times, so favour size.
const BZIP2_LEVEL: BzCompression = BzCompression::best();
const GZIP_LEVEL: GzCompression = GzCompression::best();
#[cfg(feature = "xz")]
const XZ_LEVEL: u32 = 9;
#[cfg(feature = "zstd")]
const ZSTD_LEVEL: i32 = 19;

/// Raise a decoder's I/O error under the matching category.
pub(crate) fn raise_io(e: std::io::Error) -> crate::error::Error {
    let kind = ErrorKind::from_io(&e);
    exn::Exn::from(e).raise(kind)
}

impl Compression {
    /// Compress a byte slice in memory as a single member.
    ///
    /// # Examples
    ///
    /// ```
    /// use offwiki_compress::Compression;
    ///
    /// let data = b"<page><title>Cat</title></page>";
    /// let compressed = Compression::Bzip2.compress(data).unwrap();
    /// assert_eq!(Compression::Bzip2.decompress(&compressed).unwrap(), data);
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len(), output_size))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(&mut output, BZIP2_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, GZIP_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            #[cfg(feature = "xz")]
            Compression::Xz => {
                let mut encoder = XzEncoder::new(&mut output, XZ_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            #[cfg(feature = "zstd")]
            Compression::Zstd => {
                let mut encoder = ZstdEncoder::new(&mut output, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?;
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
        }
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }

    /// Decompress every member of a byte slice in memory.
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.wrap_multi_reader(input)?.read_to_end(&mut output).map_err(raise_io)?;
        Ok(output)
    }

    /// Wrap a reader with a decoder that stops at the end of the **first**
    /// compressed member.
    ///
    /// Bytes after the member boundary may be buffered but are never decoded.
    /// This is what makes random access into a multistream archive possible:
    /// seek to a member's offset, wrap, and read to end.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            #[cfg(feature = "xz")]
            Compression::Xz => Box::new(XzDecoder::new(reader)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Box::new(ZstdDecoder::new(reader).or_raise(|| ErrorKind::Encoder)?.single_frame()),
        })
    }

    /// Wrap a reader with a decoder that continues across concatenated
    /// members until the underlying reader is exhausted.
    ///
    /// Index sources are usually produced by the same multistream tooling as
    /// the archive, so streaming them needs to cross member boundaries.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Read;
    /// use offwiki_compress::Compression;
    ///
    /// let mut joined = Compression::Gzip.compress(b"100:1:Cat\n").unwrap();
    /// joined.extend(Compression::Gzip.compress(b"250:3:Elephant\n").unwrap());
    ///
    /// let mut text = String::new();
    /// Compression::Gzip.wrap_multi_reader(joined.as_slice()).unwrap().read_to_string(&mut text).unwrap();
    /// assert_eq!(text, "100:1:Cat\n250:3:Elephant\n");
    /// ```
    pub fn wrap_multi_reader<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
            #[cfg(feature = "xz")]
            Compression::Xz => Box::new(XzDecoder::new_multi_decoder(reader)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Box::new(ZstdDecoder::new(reader).or_raise(|| ErrorKind::Encoder)?),
        })
    }

    /// Decode a single member from `reader`, refusing to produce more than
    /// `limit` bytes of output.
    #[instrument(skip(reader), fields(format = %self, output_size))]
    pub fn decompress_member<R: Read>(&self, reader: R, limit: u64) -> Result<Vec<u8>> {
        let decoder = self.wrap_reader(reader)?;
        let mut output = Vec::new();
        // One byte of headroom distinguishes "exactly at the limit" from "over it".
        decoder.take(limit.saturating_add(1)).read_to_end(&mut output).map_err(raise_io)?;
        if output.len() as u64 > limit {
            exn::bail!(ErrorKind::TooLarge(limit));
        }
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }
}

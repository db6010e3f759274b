//! Random access into multistream containers.
//!
//! A multistream file is a plain concatenation of independently compressed
//! members. Any member can be decoded on its own given its starting offset,
//! and the start of the following member (or the end of the file) bounds it.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::instrument;

/// The compressed byte range `[start, end)` occupied by one member.
///
/// An open `end` means "until the member's own end marker, or end of file".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockRange {
    pub start: u64,
    pub end: Option<u64>,
}
impl BlockRange {
    pub fn new(start: u64, end: impl Into<Option<u64>>) -> Self {
        Self { start, end: end.into() }
    }

    /// Compressed length, if the range is closed.
    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.start))
    }

    /// A closed range whose end does not lie after its start cannot hold a member.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}
impl Display for BlockRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, EOF)", self.start),
        }
    }
}

impl Compression {
    /// Decode the single member occupying `range` of the file at `path`.
    ///
    /// Only the member's compressed bytes are read and at most `limit` bytes
    /// of decompressed output are materialized. Each call opens its own file
    /// handle, so concurrent reads of different ranges never contend on a
    /// shared cursor.
    ///
    /// # Errors
    /// - [`OutOfBounds`](ErrorKind::OutOfBounds) if the range is empty or
    ///   lies (partly) outside the file.
    /// - [`InvalidData`](ErrorKind::InvalidData) if the bytes do not decode.
    /// - [`TooLarge`](ErrorKind::TooLarge) if the output exceeds `limit`.
    /// - [`Io`](ErrorKind::Io) if the file cannot be opened or read.
    #[instrument(skip(path), fields(format = %self, range = %range))]
    pub fn read_block(&self, path: impl AsRef<Path>, range: BlockRange, limit: u64) -> Result<Vec<u8>> {
        if range.is_empty() || range.end.is_some_and(|end| end < range.start) {
            exn::bail!(ErrorKind::OutOfBounds(range.to_string()));
        }
        let mut file = File::open(path.as_ref()).or_raise(|| ErrorKind::Io)?;
        let size = file.metadata().or_raise(|| ErrorKind::Io)?.len();
        if range.start >= size || range.end.is_some_and(|end| end > size) {
            exn::bail!(ErrorKind::OutOfBounds(range.to_string()));
        }
        file.seek(SeekFrom::Start(range.start)).or_raise(|| ErrorKind::Io)?;
        let bounded = BufReader::new(file.take(range.len().unwrap_or(size - range.start)));
        self.decompress_member(bounded, limit)
    }
}

/// Writes independently compressed members back to back.
///
/// Each call to [`write_block`](Self::write_block) produces one complete
/// member and returns the range it occupies, which is exactly what an offset
/// index needs to record.
///
/// # Examples
///
/// ```
/// use offwiki_compress::{BlockRange, Compression, MultistreamWriter};
///
/// let mut writer = MultistreamWriter::new(Vec::new(), Compression::Bzip2);
/// let first = writer.write_block(b"<page>one</page>").unwrap();
/// let second = writer.write_block(b"<page>two</page>").unwrap();
/// assert_eq!(first.start, 0);
/// assert_eq!(first.end, Some(second.start));
/// ```
pub struct MultistreamWriter<W> {
    inner: W,
    format: Compression,
    position: u64,
}
impl<W: Write> MultistreamWriter<W> {
    pub fn new(inner: W, format: Compression) -> Self {
        Self { inner, format, position: 0 }
    }

    /// Compress `data` as a new member and append it.
    pub fn write_block(&mut self, data: &[u8]) -> Result<BlockRange> {
        let member = self.format.compress(data)?;
        self.inner.write_all(&member).or_raise(|| ErrorKind::Io)?;
        let start = self.position;
        self.position += member.len() as u64;
        Ok(BlockRange::new(start, self.position))
    }

    /// Number of bytes written so far; the offset of the next member.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().or_raise(|| ErrorKind::Io)?;
        Ok(self.inner)
    }
}

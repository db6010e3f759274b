use crate::Article;
use crate::error::{ErrorKind, Result};
use crate::page::PageScanner;
use exn::ResultExt;
use offwiki_compress::{BlockRange, Compression, MAGIC_LEN};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Upper bound on one block's decompressed size. Real blocks hold 100 pages
/// and stay in the low megabytes.
pub const DEFAULT_MAX_BLOCK_BYTES: u64 = 256 * 1024 * 1024;

/// The page an extraction is looking for.
///
/// A page matches when its id equals `id` or its title equals `title`;
/// either may be omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Target {
    pub title: Option<String>,
    pub id: Option<u64>,
}
impl Target {
    pub fn title(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), id: None }
    }

    pub fn id(id: u64) -> Self {
        Self { title: None, id: Some(id) }
    }

    /// Match on both fields, as an index entry provides them.
    pub fn entry(title: impl Into<String>, id: u64) -> Self {
        Self { title: Some(title.into()), id: Some(id) }
    }

    pub fn matches(&self, title: Option<&str>, id: Option<u64>) -> bool {
        let by_id = self.id.is_some() && self.id == id;
        let by_title = self.title.is_some() && self.title.as_deref() == title;
        by_id || by_title
    }
}
impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (&self.title, self.id) {
            (Some(title), Some(id)) => write!(f, "{title} (#{id})"),
            (Some(title), None) => write!(f, "{title}"),
            (None, Some(id)) => write!(f, "#{id}"),
            (None, None) => write!(f, "nothing"),
        }
    }
}

/// Pulls single pages out of a multistream archive.
///
/// Holds no open file: every extraction opens its own handle, so any number
/// of extractions may run concurrently against the same archive.
#[derive(Clone, Debug)]
pub struct BlockExtractor {
    archive: PathBuf,
    format: Compression,
    max_block_bytes: u64,
}
impl BlockExtractor {
    /// Check that the archive is readable and detect its compression from its
    /// leading bytes (the first block's header), falling back to its name.
    #[instrument(skip_all, fields(archive = %archive.as_ref().display(), format))]
    pub fn open(archive: impl AsRef<Path>) -> Result<Self> {
        let archive = archive.as_ref();
        let mut head = Vec::with_capacity(MAGIC_LEN);
        File::open(archive)
            .and_then(|file| file.take(MAGIC_LEN as u64).read_to_end(&mut head))
            .or_raise(|| ErrorKind::Io)?;
        let format = Compression::detect(&head, archive);
        tracing::Span::current().record("format", format.as_str());
        Ok(Self::with_format(archive, format))
    }

    /// Use a known compression format without touching the file.
    pub fn with_format(archive: impl Into<PathBuf>, format: Compression) -> Self {
        Self { archive: archive.into(), format, max_block_bytes: DEFAULT_MAX_BLOCK_BYTES }
    }

    pub fn with_max_block_bytes(mut self, limit: u64) -> Self {
        self.max_block_bytes = limit;
        self
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn format(&self) -> Compression {
        self.format
    }

    /// Decompress the block occupying `range` into XML text.
    pub fn read_block(&self, range: BlockRange) -> Result<String> {
        let result = self
            .format
            .read_block(&self.archive, range, self.max_block_bytes)
            .map_err(|err| ErrorKind::block_read(err, range))
            .and_then(|bytes| String::from_utf8(bytes).or_raise(|| ErrorKind::CorruptBlock(range)));
        if let Err(err) = &result
            && err.is_corrupt()
        {
            tracing::warn!(%range, error = ?err, "unreadable block");
        }
        result
    }

    /// Find `target` in the block occupying `range`.
    ///
    /// Only this block is read and decompressed. Pages are compared in block
    /// order and the first match wins.
    ///
    /// # Errors
    /// - [`NotFound`](ErrorKind::NotFound) if no page in the block matches.
    /// - [`CorruptBlock`](ErrorKind::CorruptBlock) if the block does not
    ///   decompress or its records are malformed, including empty ranges.
    /// - [`BlockTooLarge`](ErrorKind::BlockTooLarge) past the size limit.
    /// - [`Io`](ErrorKind::Io) if the archive cannot be read.
    #[instrument(skip(self), fields(range = %range, target = %target, block_bytes))]
    pub fn extract(&self, range: BlockRange, target: &Target) -> Result<Article> {
        let xml = self.read_block(range)?;
        tracing::Span::current().record("block_bytes", xml.len());
        match find_page(&xml, target) {
            Ok(Some(article)) => {
                tracing::debug!(id = article.id, text_bytes = article.text.len(), "page found");
                Ok(article)
            },
            Ok(None) => {
                tracing::debug!("no matching page in block");
                exn::bail!(ErrorKind::NotFound);
            },
            Err(err) => {
                tracing::warn!(%range, error = ?err, "malformed page records");
                Err(err.raise(ErrorKind::CorruptBlock(range)))
            },
        }
    }
}

/// Find the first page in a decompressed block matching `target`.
///
/// Pages before the match must be well formed; pages after it are not read.
pub fn find_page(xml: &str, target: &Target) -> Result<Option<Article>> {
    let mut scanner = PageScanner::new(xml);
    while let Some(record) = scanner.next_page(|record| target.matches(record.title.as_deref(), record.id))? {
        if target.matches(record.title.as_deref(), record.id) {
            return record.into_article().map(Some);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use offwiki_compress::MultistreamWriter;
    use rstest::rstest;

    fn page(title: &str, id: u64, text: &str) -> String {
        format!(
            "<page><title>{title}</title><ns>0</ns><id>{id}</id>\
             <revision><id>{}</id><text xml:space=\"preserve\">{text}</text></revision></page>\n",
            id + 1000
        )
    }

    /// The animals archive: `Cat` and `Dog` share the first block.
    fn archive(format: Compression) -> (tempfile::NamedTempFile, Vec<BlockRange>) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = MultistreamWriter::new(file.reopen().unwrap(), format);
        let first = format!("<mediawiki>\n{}{}", page("Cat", 1, "Meow."), page("Dog", 2, "Woof."));
        let second = format!("{}</mediawiki>\n", page("Elephant", 3, "Trumpet."));
        let ranges = vec![writer.write_block(first.as_bytes()).unwrap(), writer.write_block(second.as_bytes()).unwrap()];
        writer.finish().unwrap();
        (file, ranges)
    }

    #[rstest]
    #[case(Target::entry("Dog", 2), "Woof.")]
    #[case(Target::title("Dog"), "Woof.")]
    #[case(Target::id(1), "Meow.")]
    // Renamed since the index was built: the id still finds it.
    #[case(Target::entry("Hound", 2), "Woof.")]
    fn test_extract_by_title_or_id(#[case] target: Target, #[case] expected: &str) {
        let (file, ranges) = archive(Compression::Bzip2);
        let extractor = BlockExtractor::open(file.path()).unwrap();
        assert_eq!(extractor.format(), Compression::Bzip2);
        assert_eq!(extractor.extract(ranges[0], &target).unwrap().text, expected);
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    fn test_extract_last_block_open_range(#[case] format: Compression) {
        let (file, ranges) = archive(format);
        let extractor = BlockExtractor::with_format(file.path(), format);
        let article = extractor.extract(BlockRange::new(ranges[1].start, None), &Target::title("Elephant")).unwrap();
        assert_eq!((article.id, article.text.as_str()), (3, "Trumpet."));
    }

    #[test]
    fn test_extract_not_in_block() {
        let (file, ranges) = archive(Compression::Bzip2);
        let extractor = BlockExtractor::open(file.path()).unwrap();
        let err = extractor.extract(ranges[1], &Target::entry("Dog", 2)).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound);
    }

    #[test]
    fn test_zero_length_range_is_corrupt() {
        let (file, ranges) = archive(Compression::Bzip2);
        let extractor = BlockExtractor::open(file.path()).unwrap();
        let empty = BlockRange::new(ranges[1].start, ranges[1].start);
        let err = extractor.extract(empty, &Target::entry("Elephant", 3)).unwrap_err();
        assert_eq!(*err, ErrorKind::CorruptBlock(empty));
    }

    #[test]
    fn test_misaligned_range_is_corrupt() {
        let (file, ranges) = archive(Compression::Bzip2);
        let extractor = BlockExtractor::open(file.path()).unwrap();
        let misaligned = BlockRange::new(ranges[0].start + 3, ranges[0].end);
        let err = extractor.extract(misaligned, &Target::title("Cat")).unwrap_err();
        assert!(err.is_corrupt(), "unexpected error: {err:?}");
    }

    #[test]
    fn test_block_too_large() {
        let (file, ranges) = archive(Compression::Bzip2);
        let extractor = BlockExtractor::open(file.path()).unwrap().with_max_block_bytes(16);
        let err = extractor.extract(ranges[0], &Target::title("Cat")).unwrap_err();
        assert_eq!(*err, ErrorKind::BlockTooLarge { range: ranges[0], limit: 16 });
    }

    #[test]
    fn test_malformed_records_are_corrupt() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = MultistreamWriter::new(file.reopen().unwrap(), Compression::Bzip2);
        let range = writer.write_block(b"<page><title>Cat</title><id>1</id><revision><text>Meow").unwrap();
        writer.finish().unwrap();
        let err = BlockExtractor::open(file.path()).unwrap().extract(range, &Target::title("Cat")).unwrap_err();
        assert_eq!(*err, ErrorKind::CorruptBlock(range));
    }

    #[test]
    fn test_open_missing_archive() {
        let err = BlockExtractor::open("/definitely/not/here.xml.bz2").unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
    }

    #[test]
    fn test_find_page_stops_at_first_match() {
        let xml = format!("{}{}", page("Cat", 1, "first"), page("Cat", 7, "second"));
        assert_eq!(find_page(&xml, &Target::title("Cat")).unwrap().unwrap().text, "first");
        // Records after the match are never read, broken or not.
        let xml = format!("{}<page><title>Broken", page("Cat", 1, "first"));
        assert_eq!(find_page(&xml, &Target::id(1)).unwrap().unwrap().id, 1);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::entry("Dog", 2).to_string(), "Dog (#2)");
        assert_eq!(Target::id(2).to_string(), "#2");
        assert!(!Target::default().matches(None, None));
    }
}

use crate::error::{ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

/// Field separator used by multistream index sources.
pub const DELIMITER: u8 = b':';

/// One line of the index source: where a title lives inside the archive.
///
/// Many entries share a `block_offset`; they were compressed together.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    pub title: Arc<str>,
    pub article_id: u64,
    pub block_offset: u64,
}
impl Display for IndexEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}:{}", self.block_offset, self.article_id, self.title)
    }
}

/// Case-fold a title or query for case-insensitive comparison.
///
/// Every ordered structure in this crate is keyed by this form, so callers
/// comparing against [`OffsetIndex`](crate::OffsetIndex) results must fold
/// the same way.
#[inline]
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Characters that end one word of a title and start the next.
pub fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | ',' | '.' | ':' | ';' | '(' | ')' | '[' | ']' | '/')
}

/// Every word of a folded title except the one it starts with.
pub(crate) fn later_words(folded: &str) -> impl Iterator<Item = &str> {
    folded.split(is_separator).skip(1).filter(|word| !word.is_empty())
}

/// Parse one raw line of the index source.
///
/// Lines look like `offset:id:title`. Only the first two delimiters split
/// fields, so `600:42:Star Wars: A New Hope` keeps its colon in the title.
/// Surrounding whitespace (line terminators included) is ignored and blank
/// lines yield `Ok(None)`.
///
/// # Examples
///
/// ```
/// use offwiki_index::parse_line;
///
/// let entry = parse_line(b"600:42:Star Wars: A New Hope\n", 1).unwrap().unwrap();
/// assert_eq!(entry.block_offset, 600);
/// assert_eq!(entry.article_id, 42);
/// assert_eq!(&*entry.title, "Star Wars: A New Hope");
/// ```
pub fn parse_line(raw: &[u8], line: u64) -> Result<Option<IndexEntry>> {
    let malformed = |reason| ErrorKind::MalformedLine { line, reason };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let Ok(text) = std::str::from_utf8(raw) else {
        exn::bail!(malformed("not valid UTF-8"));
    };
    let text = text.trim();
    let Some(first) = memchr::memchr(DELIMITER, text.as_bytes()) else {
        exn::bail!(malformed("expected three fields"));
    };
    let Some(second) = memchr::memchr(DELIMITER, &text.as_bytes()[first + 1..]).map(|pos| first + 1 + pos) else {
        exn::bail!(malformed("expected three fields"));
    };
    let Some(block_offset) = parse_unsigned(&text[..first]) else {
        exn::bail!(malformed("block offset is not an unsigned integer"));
    };
    let Some(article_id) = parse_unsigned(&text[first + 1..second]) else {
        exn::bail!(malformed("article id is not an unsigned integer"));
    };
    let title = &text[second + 1..];
    if title.trim().is_empty() {
        exn::bail!(malformed("missing title"));
    }
    Ok(Some(IndexEntry { title: Arc::from(title), article_id, block_offset }))
}

/// Plain decimal digits only; `u64::from_str` would also take a leading `+`.
fn parse_unsigned(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

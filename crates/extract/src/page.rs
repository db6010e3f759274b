//! Streaming scan over the `<page>` records of one decompressed block.

use crate::Article;
use crate::consts::tag;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Fields of a page as they are read; `text` is only kept when asked for.
#[derive(Debug, Default)]
pub(crate) struct PageRecord {
    pub title: Option<String>,
    pub id: Option<u64>,
    pub namespace: Option<i64>,
    pub redirect: Option<String>,
    pub text: Option<String>,
}
impl PageRecord {
    pub fn into_article(self) -> Result<Article> {
        let Some(title) = self.title else {
            exn::bail!(malformed("page has no title"));
        };
        let Some(id) = self.id else {
            exn::bail!(malformed("page has no id"));
        };
        Ok(Article {
            title,
            id,
            namespace: self.namespace.unwrap_or_default(),
            redirect: self.redirect,
            text: self.text.unwrap_or_default(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Title,
    Namespace,
    Id,
    Text,
}
impl Field {
    /// The field captured by the element at `path`, relative to `<page>`.
    fn at(path: &[Vec<u8>]) -> Option<Self> {
        match path {
            [name] if name == tag::TITLE => Some(Field::Title),
            [name] if name == tag::NS => Some(Field::Namespace),
            [name] if name == tag::ID => Some(Field::Id),
            [revision, text] if revision == tag::REVISION && text == tag::TEXT => Some(Field::Text),
            _ => None,
        }
    }
}

fn malformed(reason: impl Into<String>) -> ErrorKind {
    ErrorKind::MalformedRecord(reason.into())
}

/// Reads page records from a block, one at a time.
///
/// A block is an XML fragment: sibling `<page>` elements, possibly preceded
/// by the dump's `<mediawiki>` and `<siteinfo>` header (first block) or
/// followed by the closing `</mediawiki>` (last block). Anything outside a
/// page is skipped.
pub(crate) struct PageScanner<'a> {
    reader: Reader<&'a [u8]>,
}
impl<'a> PageScanner<'a> {
    pub fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        // Blocks split the document arbitrarily, so unmatched closing tags
        // outside pages are expected. Nesting inside pages is checked below.
        reader.check_end_names(false);
        Self { reader }
    }

    /// Read the next page, or `None` at the end of the block.
    ///
    /// `keep_text` is asked once the page's `<text>` is reached, with every
    /// header field read so far; bodies of pages it rejects are skipped
    /// without being unescaped or copied.
    pub fn next_page(&mut self, keep_text: impl Fn(&PageRecord) -> bool) -> Result<Option<PageRecord>> {
        if !self.seek_page()? {
            return Ok(None);
        }
        let mut record = PageRecord::default();
        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut capture: Option<(Field, usize)> = None;
        let mut buffer = String::new();
        loop {
            match self.read_event()? {
                Event::Start(e) => {
                    if path.is_empty() && e.name().as_ref() == tag::REDIRECT {
                        record.redirect = redirect_title(&e)?;
                    }
                    path.push(e.name().as_ref().to_vec());
                    capture = Field::at(&path)
                        .filter(|field| *field != Field::Text || keep_text(&record))
                        .map(|field| (field, path.len()));
                    buffer.clear();
                },
                Event::Empty(e) => {
                    if path.is_empty() && e.name().as_ref() == tag::REDIRECT {
                        record.redirect = redirect_title(&e)?;
                    }
                    // `<text bytes="0" />`
                    let mut at = path.clone();
                    at.push(e.name().as_ref().to_vec());
                    if Field::at(&at) == Some(Field::Text) && record.text.is_none() && keep_text(&record) {
                        record.text = Some(String::new());
                    }
                },
                Event::Text(t) => {
                    if capture.is_some() {
                        buffer.push_str(&t.unescape().or_raise(|| malformed("invalid character data"))?);
                    }
                },
                Event::CData(c) => {
                    if capture.is_some() {
                        let bytes = c.into_inner();
                        buffer.push_str(std::str::from_utf8(&bytes).or_raise(|| malformed("CDATA is not UTF-8"))?);
                    }
                },
                Event::End(e) => {
                    let Some(open) = path.pop() else {
                        if e.name().as_ref() == tag::PAGE {
                            return Ok(Some(record));
                        }
                        exn::bail!(malformed("unexpected closing tag inside page"));
                    };
                    if open != e.name().as_ref() {
                        exn::bail!(malformed(format!(
                            "<{}> closed by </{}>",
                            String::from_utf8_lossy(&open),
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    if let Some((field, _)) = capture.take_if(|(_, depth)| *depth == path.len() + 1) {
                        store(&mut record, field, std::mem::take(&mut buffer))?;
                    }
                },
                Event::Eof => exn::bail!(malformed("block ends inside a page")),
                _ => {},
            }
        }
    }

    /// Advance to just past the next `<page>` start tag.
    fn seek_page(&mut self) -> Result<bool> {
        loop {
            match self.read_event()? {
                Event::Start(e) if e.name().as_ref() == tag::PAGE => return Ok(true),
                Event::Empty(e) if e.name().as_ref() == tag::PAGE => exn::bail!(malformed("empty page element")),
                Event::Eof => return Ok(false),
                _ => {},
            }
        }
    }

    fn read_event(&mut self) -> Result<Event<'a>> {
        self.reader.read_event().or_raise(|| malformed("invalid XML"))
    }
}

fn store(record: &mut PageRecord, field: Field, value: String) -> Result<()> {
    match field {
        Field::Title if record.title.is_none() => record.title = Some(value),
        Field::Namespace if record.namespace.is_none() => {
            let namespace = value.trim().parse::<i64>().or_raise(|| malformed(format!("namespace {value:?} is not an integer")))?;
            record.namespace = Some(namespace);
        },
        Field::Id if record.id.is_none() => {
            let id = value.trim().parse::<u64>().or_raise(|| malformed(format!("page id {value:?} is not an integer")))?;
            record.id = Some(id);
        },
        Field::Text if record.text.is_none() => record.text = Some(value),
        // Repeated elements: the first one counts.
        _ => {},
    }
    Ok(())
}

fn redirect_title(element: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() == b"title" {
            let title = attr.unescape_value().or_raise(|| malformed("invalid redirect title"))?;
            return Ok(Some(title.into_owned()));
        }
    }
    Ok(None)
}

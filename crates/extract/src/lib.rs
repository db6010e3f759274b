//! Isolating one compressed block of a multistream dump and pulling a page
//! out of it.
//!
//! Dumps are `pages-articles-multistream.xml.bz2` style archives: the XML
//! export is cut into blocks of (usually) 100 pages and each block is
//! compressed on its own. An index gives the block offset of every title;
//! the [`BlockExtractor`] decompresses just that block and scans its page
//! records for the one requested.

mod article;
mod consts;
pub mod error;
mod extract;
mod page;

pub use crate::article::Article;
pub use crate::extract::{BlockExtractor, DEFAULT_MAX_BLOCK_BYTES, Target, find_page};
pub use offwiki_compress::{BlockRange, Compression};

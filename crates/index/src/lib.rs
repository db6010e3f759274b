//! Title to block offset index for multistream dumps.
//!
//! The index source is a (usually bzip2 compressed) text file with one line
//! per article, `offset:id:title`, where `offset` is the byte position of the
//! compressed block holding the article inside the archive. Sources for large
//! wikis run to tens of millions of lines, so an [`OffsetIndex`] is filled in
//! the background and answers lookups from whatever has been ingested so far:
//!
//! ```no_run
//! # async fn run() -> offwiki_index::error::Result<()> {
//! use std::sync::Arc;
//! use offwiki_index::{IndexSource, LoadOptions, OffsetIndex};
//!
//! let index = Arc::new(OffsetIndex::new());
//! let handle = index.begin_load(IndexSource::new("enwiki-multistream-index.txt.bz2"), LoadOptions::default())?;
//! // Usable immediately; results grow as the load progresses.
//! let early = index.lookup_prefix("cat", 10);
//! handle.wait().await?;
//! assert!(index.is_complete());
//! # Ok(())
//! # }
//! ```

mod entry;
pub mod error;
mod index;
mod load;
mod status;

pub use crate::entry::{DELIMITER, IndexEntry, fold, is_separator, parse_line};
pub use crate::index::OffsetIndex;
pub use crate::load::{IndexSource, LoadHandle, LoadOptions, LoadSummary};
pub use crate::status::{IndexStatus, LoadState};
pub use offwiki_compress::BlockRange;

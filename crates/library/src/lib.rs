//! Search and read articles from a multistream dump while its index loads.
//!
//! A [`Library`] ties the pieces together: an [`OffsetIndex`] filled in the
//! background, a [`SearchService`] ranking titles from it, and a
//! [`RetrievalService`] turning a title into an [`Article`] through a shared
//! LRU cache and block extraction.
//!
//! ```no_run
//! # async fn run() -> offwiki_library::error::Result<()> {
//! use offwiki_config::Config;
//! use offwiki_library::Library;
//!
//! let config = Config::load(None).map_err(offwiki_library::error::ErrorKind::config)?;
//! let (library, loading) = Library::open(&config)?;
//! // Answers from whatever has been indexed so far.
//! let titles = library.search("cat", 10);
//! if let Some(title) = titles.first() {
//!     let article = library.get_article(title).await?;
//!     println!("{}", article.text);
//! }
//! loading.wait().await.map_err(offwiki_library::error::ErrorKind::index)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
mod retrieval;
mod search;
#[cfg(test)]
mod testing;

pub use crate::retrieval::{Articles, RetrievalService};
pub use crate::search::{Rank, SearchService};
pub use offwiki_extract::Article;
pub use offwiki_index::{IndexStatus, LoadHandle, LoadState, OffsetIndex};

use crate::error::{ErrorKind, Result};
use offwiki_cache::ArticleCache;
use offwiki_config::Config;
use offwiki_extract::BlockExtractor;
use offwiki_index::{IndexSource, LoadOptions};
use std::sync::Arc;
use tracing::instrument;

/// An opened dump: search, retrieval and the index they share.
pub struct Library {
    index: Arc<OffsetIndex>,
    search: SearchService,
    retrieval: RetrievalService,
}
impl Library {
    /// Open the archive and start loading the index in the background.
    ///
    /// Returns as soon as the load has been scheduled; the library answers
    /// queries straight away from whatever has been indexed. Must be called
    /// from within a Tokio runtime.
    ///
    /// # Errors
    /// - [`Config`](ErrorKind::Config) for invalid configuration.
    /// - [`Extraction`](ErrorKind::Extraction) if the archive is unreadable.
    /// - [`Cache`](ErrorKind::Cache) if the cache cannot be built.
    /// - [`Index`](ErrorKind::Index) if the load cannot be scheduled.
    ///
    /// Failures of the load itself are reported by the returned handle and
    /// by [`index_status`](Self::index_status).
    #[instrument(skip_all, fields(archive = %config.archive.display(), index = %config.index.display()))]
    pub fn open(config: &Config) -> Result<(Self, LoadHandle)> {
        config.validate().map_err(ErrorKind::config)?;
        let extractor = match config.archive_format().map_err(ErrorKind::config)? {
            Some(format) => BlockExtractor::with_format(&config.archive, format),
            None => BlockExtractor::open(&config.archive).map_err(ErrorKind::extraction)?,
        }
        .with_max_block_bytes(config.retrieval.max_block_bytes);
        let format = extractor.format();
        let cache = ArticleCache::new(config.cache.capacity).map_err(ErrorKind::cache)?;

        let mut source = IndexSource::new(&config.index);
        if let Some(format) = config.index_format().map_err(ErrorKind::config)? {
            source = source.with_compression(format);
        }
        let options = LoadOptions {
            batch_size: config.loading.batch_size,
            count_total: config.loading.count_total,
            progress_interval: config.loading.progress_interval,
        };
        let index = Arc::new(OffsetIndex::new());
        let handle = index.begin_load(source, options).map_err(ErrorKind::index)?;

        let search = SearchService::new(Arc::clone(&index), &config.search);
        let retrieval = RetrievalService::new(Arc::clone(&index), extractor, cache)
            .with_follow_redirects(config.retrieval.follow_redirects);
        tracing::info!(format = format.as_str(), "library opened");
        Ok((Self { index, search, retrieval }, handle))
    }

    /// Up to `limit` titles matching `query`, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Arc<str>> {
        self.search.search(query, limit)
    }

    /// The article titled exactly `title`.
    pub async fn get_article(&self, title: &str) -> Result<Arc<Article>> {
        self.retrieval.get_article(title).await
    }

    /// Other casings of `title` that are indexed, for "did you mean".
    pub fn suggest(&self, title: &str) -> Vec<Arc<str>> {
        self.retrieval.suggest(title)
    }

    pub fn index_status(&self) -> IndexStatus {
        self.index.status()
    }

    pub fn index(&self) -> &Arc<OffsetIndex> {
        &self.index
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }
}

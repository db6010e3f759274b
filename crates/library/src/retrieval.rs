use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use offwiki_cache::ArticleCache;
use offwiki_extract::{Article, BlockExtractor, BlockRange, Target};
use offwiki_index::{IndexEntry, OffsetIndex};
use std::sync::Arc;
use tracing::instrument;

/// Cache of decompressed articles, keyed by the title they were requested as.
pub type Articles = ArticleCache<String, Arc<Article>>;

/// Title to article: index lookup, then cache, then block extraction.
///
/// Extraction runs on the blocking thread pool. Concurrent requests for the
/// same title share one extraction; requests for different titles never wait
/// on each other.
pub struct RetrievalService {
    index: Arc<OffsetIndex>,
    extractor: BlockExtractor,
    cache: Articles,
    follow_redirects: u8,
}
impl RetrievalService {
    pub fn new(index: Arc<OffsetIndex>, extractor: BlockExtractor, cache: Articles) -> Self {
        Self { index, extractor, cache, follow_redirects: 0 }
    }

    /// Follow up to `hops` redirect pages before giving up. Zero (the
    /// default) returns redirect pages as they are.
    pub fn with_follow_redirects(mut self, hops: u8) -> Self {
        self.follow_redirects = hops;
        self
    }

    pub fn cache(&self) -> &Articles {
        &self.cache
    }

    /// The article titled `title`, following redirects if configured to.
    ///
    /// # Errors
    /// - [`NotFound`](ErrorKind::NotFound) if a title on the way is not
    ///   indexed (yet, if the index is still loading).
    /// - [`TooManyRedirects`](ErrorKind::TooManyRedirects) if the chain is
    ///   longer than the configured number of hops.
    /// - [`Extraction`](ErrorKind::Extraction) if the block cannot be read or
    ///   does not hold the page.
    /// - [`Aborted`](ErrorKind::Aborted) if the extraction task died.
    #[instrument(skip(self), fields(redirects))]
    pub async fn get_article(&self, title: &str) -> Result<Arc<Article>> {
        let mut article = self.get_page(title).await?;
        for hop in 0..self.follow_redirects {
            let Some(target) = article.redirect_target() else {
                tracing::Span::current().record("redirects", hop);
                return Ok(article);
            };
            let target = self.resolve(target);
            tracing::debug!(from = %article.title, to = %target, "following redirect");
            article = self.get_page(&target).await?;
        }
        if self.follow_redirects > 0 && article.is_redirect() {
            exn::bail!(ErrorKind::TooManyRedirects { title: title.to_string(), hops: self.follow_redirects });
        }
        Ok(article)
    }

    /// The page stored under exactly `title`, redirect or not.
    pub async fn get_page(&self, title: &str) -> Result<Arc<Article>> {
        let Some(entry) = self.index.lookup_exact(title) else {
            let index_complete = self.index.is_complete();
            tracing::debug!(title, index_complete, "title not indexed");
            exn::bail!(ErrorKind::NotFound { title: title.to_string(), index_complete });
        };
        self.cache.get_or_compute(title.to_string(), || self.extract(entry)).await
    }

    /// Indexed titles equal to `title` ignoring case, other than `title`
    /// itself. Callers offer them when a lookup comes back not found.
    pub fn suggest(&self, title: &str) -> Vec<Arc<str>> {
        self.index
            .lookup_exact_folded(title)
            .into_iter()
            .map(|entry| entry.title)
            .filter(|candidate| **candidate != *title)
            .collect()
    }

    async fn extract(&self, entry: IndexEntry) -> Result<Arc<Article>> {
        // Published entries always have their offset indexed.
        let range = self.index.block_range(entry.block_offset).unwrap_or(BlockRange::new(entry.block_offset, None));
        let extractor = self.extractor.clone();
        let target = Target::entry(&*entry.title, entry.article_id);
        let article = tokio::task::spawn_blocking(move || extractor.extract(range, &target))
            .await
            .or_raise(|| ErrorKind::Aborted)?
            .map_err(ErrorKind::extraction)?;
        Ok(Arc::new(article))
    }

    /// The indexed title a redirect target refers to.
    ///
    /// Wikitext links may use underscores and a lowercase first letter;
    /// stored titles use spaces and start uppercase.
    fn resolve(&self, target: &str) -> String {
        if self.index.lookup_exact(target).is_some() {
            return target.to_string();
        }
        let target = target.trim().replace('_', " ");
        let mut chars = target.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => target,
        }
    }
}

//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Failures from the component crates are wrapped with
//! their own kind preserved, so callers can tell a corrupt block from a
//! missing title without walking the tree.

use derive_more::{Display, Error};
use offwiki_cache::error::{Error as CacheError, ErrorKind as CacheErrorKind};
use offwiki_config::error::{Error as ConfigError, ErrorKind as ConfigErrorKind};
use offwiki_extract::error::{Error as ExtractError, ErrorKind as ExtractErrorKind};
use offwiki_index::error::{Error as IndexError, ErrorKind as IndexErrorKind};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Lookup Errors
/// - [`ErrorKind::NotFound`]
/// - [`ErrorKind::TooManyRedirects`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Extraction`]
/// - [`ErrorKind::Index`]
/// - [`ErrorKind::Cache`]
/// - [`ErrorKind::Config`]
/// - [`ErrorKind::Aborted`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The title is not in the index. While the index is still loading the
    /// title may yet appear, so `index_complete` tells a definite miss apart.
    #[display("article not found: {title}")]
    NotFound {
        #[error(not(source))]
        title: String,
        index_complete: bool,
    },
    /// A redirect chain was longer than the configured number of hops.
    #[display("too many redirects from {title} (followed {hops})")]
    TooManyRedirects {
        #[error(not(source))]
        title: String,
        hops: u8,
    },
    /// Reading the article's block or finding the page inside it failed.
    #[display("extraction failed: {_0}")]
    Extraction(ExtractErrorKind),
    /// The offset index could not be loaded.
    #[display("index error: {_0}")]
    Index(IndexErrorKind),
    /// The article cache could not be built.
    #[display("cache error: {_0}")]
    Cache(CacheErrorKind),
    /// The configuration is unusable.
    #[display("configuration error: {_0}")]
    Config(ConfigErrorKind),
    /// A background extraction panicked or was cancelled with the runtime.
    #[display("extraction task was aborted")]
    Aborted,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound { index_complete, .. } => !index_complete,
            Self::Extraction(kind) => kind.is_retryable(),
            Self::Index(kind) => kind.is_retryable(),
            Self::Aborted => true,
            Self::TooManyRedirects { .. } | Self::Cache(_) | Self::Config(_) => false,
        }
    }

    /// Convert an extraction error, preserving its error tree as a child.
    #[track_caller]
    pub fn extraction(err: ExtractError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Extraction(inner))
    }

    /// Convert an index error, preserving its error tree as a child.
    #[track_caller]
    pub fn index(err: IndexError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Index(inner))
    }

    /// Convert a cache error, preserving its error tree as a child.
    #[track_caller]
    pub fn cache(err: CacheError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Cache(inner))
    }

    /// Convert a configuration error, preserving its error tree as a child.
    #[track_caller]
    pub fn config(err: ConfigError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Config(inner))
    }
}

//! Layered configuration for offwiki.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A configuration file: TOML, YAML or JSON by extension. Either given
//!    explicitly or looked up at [`default_path`]
//! 3. Environment variables prefixed with [`ENV_PREFIX`]; nested keys are
//!    separated by a double underscore (`OFFWIKI_CACHE__CAPACITY=500`)
//!
//! ```toml
//! archive = "/data/enwiki-20240601-pages-articles-multistream.xml.bz2"
//! index = "/data/enwiki-20240601-pages-articles-multistream-index.txt.bz2"
//!
//! [cache]
//! capacity = 100
//!
//! [search]
//! min_query_length = 2
//! max_results = 50
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use offwiki_compress::Compression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "OFFWIKI_";
const CONFIG_FILE_NAME: &str = "config.toml";

/// The per-user configuration file location, if the platform has one.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "offwiki", "offwiki").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The multistream article archive.
    pub archive: PathBuf,
    /// The index source listing `offset:id:title` for every article.
    pub index: PathBuf,
    /// Compression of the archive, when it should not be detected.
    pub archive_format: Option<String>,
    /// Compression of the index source, when it should not be detected.
    pub index_format: Option<String>,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub retrieval: RetrievalConfig,
    pub loading: LoadingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Decompressed articles kept in memory.
    pub capacity: usize,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Queries shorter than this (in characters) return no results.
    pub min_query_length: usize,
    /// Upper bound on results per query, whatever the caller asks for.
    pub max_results: usize,
    /// Titles in these namespaces (`Namespace:Title`) never appear in results.
    pub excluded_namespaces: Vec<String>,
}
impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_length: 2,
            max_results: 50,
            excluded_namespaces: ["Template", "File", "User", "Talk", "Wikipedia", "Help", "Portal"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Largest decompressed block accepted before it is treated as corrupt.
    pub max_block_bytes: u64,
    /// Redirect pages followed before giving up; `0` returns redirects as is.
    pub follow_redirects: u8,
}
impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { max_block_bytes: 256 * 1024 * 1024, follow_redirects: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// Index entries made visible to readers together.
    pub batch_size: usize,
    /// Count the index lines before loading to report progress as a fraction.
    pub count_total: bool,
    /// Log load progress every this many lines; `0` disables progress logs.
    pub progress_interval: u64,
}
impl Default for LoadingConfig {
    fn default() -> Self {
        Self { batch_size: 5_000, count_total: false, progress_interval: 500_000 }
    }
}

impl Config {
    /// Build the layered figment without extracting it.
    ///
    /// An explicit `file` replaces the default location; a missing default
    /// file is not an error.
    pub fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match file.map(Path::to_path_buf).or_else(default_path) {
            Some(path) => merge_file(figment, &path),
            None => figment,
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration from every source.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file
            && !path.is_file()
        {
            exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
        }
        Self::from_figment(&Self::figment(file))
    }

    /// Extract and validate configuration from a prepared figment.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(archive = %config.archive.display(), index = %config.index.display(), "configuration loaded");
        Ok(config)
    }

    /// Check every value the services rely on.
    ///
    /// Paths are only checked for presence here; whether they can be read
    /// is reported by the component that opens them.
    pub fn validate(&self) -> Result<()> {
        if self.archive.as_os_str().is_empty() {
            exn::bail!(invalid("archive", "a path to the multistream archive is required"));
        }
        if self.index.as_os_str().is_empty() {
            exn::bail!(invalid("index", "a path to the index source is required"));
        }
        if self.cache.capacity == 0 {
            exn::bail!(ErrorKind::CapacityMisconfigured);
        }
        if self.search.min_query_length == 0 {
            exn::bail!(invalid("search.min_query_length", "must be at least 1"));
        }
        if self.search.max_results == 0 {
            exn::bail!(invalid("search.max_results", "must be at least 1"));
        }
        if self.loading.batch_size == 0 {
            exn::bail!(invalid("loading.batch_size", "must be at least 1"));
        }
        if self.retrieval.max_block_bytes == 0 {
            exn::bail!(invalid("retrieval.max_block_bytes", "must be at least 1"));
        }
        self.archive_format()?;
        self.index_format()?;
        Ok(())
    }

    /// The configured archive compression, or `None` to detect it.
    pub fn archive_format(&self) -> Result<Option<Compression>> {
        parse_format("archive_format", self.archive_format.as_deref())
    }

    /// The configured index source compression, or `None` to detect it.
    pub fn index_format(&self) -> Result<Option<Compression>> {
        parse_format("index_format", self.index_format.as_deref())
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ErrorKind {
    ErrorKind::Invalid { key, reason: reason.into() }
}

fn parse_format(key: &'static str, value: Option<&str>) -> Result<Option<Compression>> {
    match value {
        None => Ok(None),
        Some(name) if name.eq_ignore_ascii_case("auto") => Ok(None),
        Some(name) => name.parse::<Compression>().map(Some).or_raise(|| invalid(key, format!("unknown compression format {name:?}"))),
    }
}

fn merge_file(figment: Figment, path: &Path) -> Figment {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase);
    match extension.as_deref() {
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}

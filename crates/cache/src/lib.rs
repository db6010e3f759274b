//! Bounded, concurrency-aware cache of decompressed articles.
//!
//! Decompressing a block costs far more than serving a page from memory, and
//! popular articles are requested in bursts. [`ArticleCache`] keeps a fixed
//! number of recently used values and makes sure that a burst of requests for
//! the same missing key triggers a single computation:
//!
//! - **Eviction** is strict least-recently-used over an entry count; every
//!   successful get or insert marks the entry most recently used ([`Lru`]).
//! - **Single flight**: [`ArticleCache::get_or_compute`] runs at most one
//!   computation per key at a time; concurrent callers wait for its result.
//! - **Cancellation**: abandoning a call at any `.await` leaves no partial
//!   state behind. Nothing is cached until a computation completes.

mod cache;
pub mod error;
mod lru;

pub use crate::cache::ArticleCache;
pub use crate::lru::Lru;

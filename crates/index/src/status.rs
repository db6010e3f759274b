use derive_more::Display;
use std::sync::Arc;

/// Where an index is in its single load.
#[derive(Clone, Debug, Default, Display, PartialEq, Eq)]
pub enum LoadState {
    /// No load has been started.
    #[default]
    #[display("idle")]
    Idle,
    #[display("loading")]
    Loading,
    /// The source was exhausted; the index will never change again.
    #[display("complete")]
    Complete,
    /// The load stopped early. Entries ingested before the failure remain
    /// queryable, but the index is not complete.
    #[display("failed: {_0}")]
    Failed(String),
}

/// A point-in-time view of the load's progress.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexStatus {
    /// Entries currently visible to lookups.
    pub entries_loaded: u64,
    pub malformed_lines: u64,
    /// Lines skipped because their title was already indexed.
    pub duplicate_lines: u64,
    /// Total number of lines in the source, when a pre-count was requested.
    pub total_hint: Option<u64>,
    /// Most recently published title, useful for progress display.
    pub last_title: Option<Arc<str>>,
    pub state: LoadState,
}
impl IndexStatus {
    pub fn complete(&self) -> bool {
        self.state == LoadState::Complete
    }

    /// Fraction of the source ingested, if the total is known.
    pub fn progress(&self) -> Option<f64> {
        match self.total_hint {
            Some(0) => Some(1.0),
            Some(total) => {
                let seen = self.entries_loaded + self.malformed_lines + self.duplicate_lines;
                Some((seen as f64 / total as f64).min(1.0))
            },
            None => None,
        }
    }
}

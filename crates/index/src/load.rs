//! Streaming the index source into an [`OffsetIndex`].

use crate::OffsetIndex;
use crate::entry::{fold, parse_line};
use crate::error::{ErrorKind, Result, raise_io};
use crate::status::LoadState;
use exn::ResultExt;
use offwiki_compress::{Compression, MAGIC_LEN};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Malformed lines beyond this many are counted but not logged individually.
const MALFORMED_WARN_LIMIT: u64 = 10;
const READ_BUFFER_BYTES: usize = 256 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Entries parsed before they are published to readers together.
    pub batch_size: usize,
    /// Count the source's lines first so progress can be reported as a fraction.
    pub count_total: bool,
    /// Log progress every this many lines; zero disables progress logs.
    pub progress_interval: u64,
}
impl Default for LoadOptions {
    fn default() -> Self {
        Self { batch_size: 5_000, count_total: false, progress_interval: 500_000 }
    }
}

/// Outcome of a completed load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadSummary {
    pub entries: u64,
    pub malformed_lines: u64,
    pub duplicate_lines: u64,
    pub elapsed: Duration,
}

/// A line-oriented index file, compressed or not.
#[derive(Clone, Debug)]
pub struct IndexSource {
    path: PathBuf,
    compression: Option<Compression>,
}
impl IndexSource {
    /// The format is detected from the file's leading bytes, falling back to
    /// its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), compression: None }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the source as a stream of decompressed lines.
    ///
    /// The reader is neither `Send` nor `Sync` (decoder state is tied to the
    /// thread that created it), so open it on the thread that consumes it.
    pub fn open(&self) -> Result<Box<dyn BufRead>> {
        let mut file = File::open(&self.path).or_raise(|| ErrorKind::Io)?;
        let format = match self.compression {
            Some(format) => format,
            None => {
                let mut head = Vec::with_capacity(MAGIC_LEN);
                (&mut file).take(MAGIC_LEN as u64).read_to_end(&mut head).or_raise(|| ErrorKind::Io)?;
                file.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Io)?;
                Compression::detect(&head, &self.path)
            },
        };
        tracing::debug!(path = %self.path.display(), %format, "opening index source");
        let decoder = format.wrap_multi_reader(BufReader::new(file)).or_raise(|| ErrorKind::Decompression)?;
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, decoder)))
    }

    /// Count the lines in the source, decompressing it fully once.
    #[instrument(skip(self), fields(path = %self.path.display(), lines))]
    pub fn count_lines(&self) -> Result<u64> {
        let mut reader = self.open()?;
        let mut lines = 0u64;
        let mut last = b'\n';
        loop {
            let buffer = reader.fill_buf().map_err(raise_io)?;
            let Some(&tail) = buffer.last() else {
                break;
            };
            lines += memchr::memchr_iter(b'\n', buffer).count() as u64;
            last = tail;
            let consumed = buffer.len();
            reader.consume(consumed);
        }
        if last != b'\n' {
            // Unterminated final line.
            lines += 1;
        }
        tracing::Span::current().record("lines", lines);
        Ok(lines)
    }
}

/// A load running on the blocking thread pool.
///
/// Dropping the handle detaches the load; it keeps filling the index.
pub struct LoadHandle {
    index: Arc<OffsetIndex>,
    join: tokio::task::JoinHandle<Result<LoadSummary>>,
}
impl LoadHandle {
    /// Wait for the load to finish.
    pub async fn wait(self) -> Result<LoadSummary> {
        match self.join.await {
            Ok(result) => result,
            Err(join_error) => {
                self.index.update_status(|status| status.state = LoadState::Failed(join_error.to_string()));
                Err(exn::Exn::from(join_error).raise(ErrorKind::Aborted))
            },
        }
    }

    pub fn index(&self) -> &Arc<OffsetIndex> {
        &self.index
    }
}

impl OffsetIndex {
    /// Start filling the index from `source` in the background.
    ///
    /// Returns immediately; the index is queryable (and grows) while the
    /// load runs. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - [`AlreadyLoading`](ErrorKind::AlreadyLoading) if a load was started before.
    /// - [`NoRuntime`](ErrorKind::NoRuntime) outside a Tokio runtime.
    ///
    /// Failures of the load itself are reported by [`LoadHandle::wait`] and
    /// reflected in [`status`](Self::status).
    pub fn begin_load(self: &Arc<Self>, source: IndexSource, options: LoadOptions) -> Result<LoadHandle> {
        let runtime = tokio::runtime::Handle::try_current().or_raise(|| ErrorKind::NoRuntime)?;
        self.start()?;
        let index = Arc::clone(self);
        let join = runtime.spawn_blocking(move || index.load_started(&source, &options));
        Ok(LoadHandle { index: Arc::clone(self), join })
    }

    /// Fill the index from an already open reader on the current thread.
    pub fn ingest<R: BufRead>(&self, reader: R, options: &LoadOptions) -> Result<LoadSummary> {
        self.start()?;
        let result = self.ingest_started(reader, options);
        self.finish(&result);
        result
    }

    #[instrument(skip_all, fields(source = %source.path().display()))]
    fn load_started(&self, source: &IndexSource, options: &LoadOptions) -> Result<LoadSummary> {
        if options.count_total {
            match source.count_lines() {
                Ok(total) => self.update_status(|status| status.total_hint = Some(total)),
                Err(err) => tracing::warn!(error = ?err, "could not pre-count index lines, continuing without a total"),
            }
        }
        let result = source.open().and_then(|reader| self.ingest_started(reader, options));
        self.finish(&result);
        result
    }

    #[instrument(skip_all, fields(batch_size = options.batch_size))]
    fn ingest_started<R: BufRead>(&self, mut reader: R, options: &LoadOptions) -> Result<LoadSummary> {
        let started = Instant::now();
        let batch_size = options.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        let mut tally = Tally::default();
        let mut raw = Vec::new();
        let mut line = 0u64;
        tracing::info!("index load started");
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {},
                Err(e) => {
                    // Everything parsed before the failure is still valid.
                    self.flush(&mut batch, &mut tally);
                    return Err(raise_io(e));
                },
            }
            line += 1;
            match parse_line(&raw, line) {
                Ok(Some(entry)) => batch.push((fold(&entry.title).into_boxed_str(), entry)),
                Ok(None) => {},
                Err(err) => {
                    tally.malformed += 1;
                    if tally.malformed <= MALFORMED_WARN_LIMIT {
                        tracing::warn!(error = %*err, "skipping malformed index line");
                    }
                },
            }
            if batch.len() >= batch_size {
                self.flush(&mut batch, &mut tally);
            }
            if options.progress_interval > 0 && line % options.progress_interval == 0 {
                tracing::info!(line, entries = tally.published, "index load progress");
            }
        }
        self.flush(&mut batch, &mut tally);
        if tally.malformed > MALFORMED_WARN_LIMIT {
            tracing::warn!(
                malformed = tally.malformed,
                logged = MALFORMED_WARN_LIMIT,
                "further malformed index lines were skipped without logging"
            );
        }
        let summary = LoadSummary {
            entries: tally.published,
            malformed_lines: tally.malformed,
            duplicate_lines: tally.duplicates,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            entries = summary.entries,
            malformed = summary.malformed_lines,
            duplicates = summary.duplicate_lines,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "index load complete"
        );
        Ok(summary)
    }

    fn flush(&self, batch: &mut Vec<(Box<str>, crate::IndexEntry)>, tally: &mut Tally) {
        let last_title = batch.last().map(|(_, entry)| Arc::clone(&entry.title));
        let submitted = batch.len() as u64;
        let duplicates = self.publish(batch);
        tally.duplicates += duplicates;
        tally.published += submitted - duplicates;
        let tally = *tally;
        self.update_status(|status| {
            status.malformed_lines = tally.malformed;
            status.duplicate_lines = tally.duplicates;
            if last_title.is_some() {
                status.last_title = last_title;
            }
        });
    }

    fn finish(&self, result: &Result<LoadSummary>) {
        let state = match result {
            Ok(_) => LoadState::Complete,
            Err(err) => {
                let kind: &ErrorKind = err;
                tracing::error!(error = ?err, "index load failed");
                LoadState::Failed(kind.to_string())
            },
        };
        self.update_status(|status| status.state = state);
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    published: u64,
    malformed: u64,
    duplicates: u64,
}

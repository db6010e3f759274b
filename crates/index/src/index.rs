use crate::entry::{IndexEntry, fold, later_words};
use crate::error::{ErrorKind, Result};
use crate::status::{IndexStatus, LoadState};
use offwiki_compress::BlockRange;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::ops::{Bound, ControlFlow};
use std::sync::Arc;

/// Everything a lookup can see. Only ever grows.
#[derive(Default)]
struct Shelf {
    by_title: HashMap<Arc<str>, IndexEntry>,
    /// `(folded title, title)`; the tuple order is the result order of every
    /// case-insensitive lookup.
    by_folded: BTreeSet<(Box<str>, Arc<str>)>,
    /// `(folded word, title)` for every word but the first of each title.
    words: BTreeSet<(Box<str>, Arc<str>)>,
    offsets: BTreeSet<u64>,
}

/// Titles visited per read lock by [`OffsetIndex::scan_titles`].
const SCAN_CHUNK: usize = 4096;

/// Title to block offset index, readable while it is being filled.
///
/// A single writer (see [`ingest`](Self::ingest) and
/// [`begin_load`](Self::begin_load)) publishes whole batches of parsed
/// entries under a short write lock, so readers observe either all of a
/// batch or none of it and never a half-built entry. Entries are never
/// removed or modified once published.
#[derive(Default)]
pub struct OffsetIndex {
    shelf: RwLock<Shelf>,
    status: Mutex<IndexStatus>,
}
impl OffsetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a title exactly as written in the source.
    pub fn lookup_exact(&self, title: &str) -> Option<IndexEntry> {
        self.shelf.read().by_title.get(title).cloned()
    }

    /// Look up every title equal to `text` ignoring case, in result order.
    pub fn lookup_exact_folded(&self, text: &str) -> Vec<IndexEntry> {
        let folded = fold(text);
        let shelf = self.shelf.read();
        shelf
            .by_folded
            .range(from_folded(&folded))
            .take_while(|(key, _)| **key == *folded)
            .filter_map(|(_, title)| shelf.by_title.get(title).cloned())
            .collect()
    }

    /// Up to `limit` titles starting with `text`, ignoring case.
    ///
    /// Results are ordered by folded title, then by title, so repeated calls
    /// against the same index state return the same sequence.
    pub fn lookup_prefix(&self, text: &str, limit: usize) -> Vec<Arc<str>> {
        let folded = fold(text);
        let shelf = self.shelf.read();
        shelf
            .by_folded
            .range(from_folded(&folded))
            .take_while(|(key, _)| key.starts_with(folded.as_str()))
            .take(limit)
            .map(|(_, title)| Arc::clone(title))
            .collect()
    }

    /// Visit every title in result order until `visit` breaks.
    ///
    /// The visitor receives the folded form alongside the title. The read
    /// lock is released every few thousand titles so a scan of a large index
    /// never stalls ingestion; titles published meanwhile are visited only if
    /// they sort after the scan's position.
    pub fn scan_titles<F>(&self, visit: F)
    where
        F: FnMut(&str, &Arc<str>) -> ControlFlow<()>,
    {
        self.scan_titles_chunked(SCAN_CHUNK, visit);
    }

    fn scan_titles_chunked<F>(&self, chunk: usize, mut visit: F)
    where
        F: FnMut(&str, &Arc<str>) -> ControlFlow<()>,
    {
        let mut lower: Bound<(Box<str>, Arc<str>)> = Bound::Unbounded;
        loop {
            let shelf = self.shelf.read();
            let mut seen = 0;
            let from = std::mem::replace(&mut lower, Bound::Unbounded);
            for (folded, title) in shelf.by_folded.range((from, Bound::Unbounded)) {
                if visit(folded, title).is_break() {
                    return;
                }
                seen += 1;
                if seen == chunk {
                    lower = Bound::Excluded((folded.clone(), Arc::clone(title)));
                    break;
                }
            }
            if seen < chunk {
                return;
            }
        }
    }

    /// Titles with a word after their first that starts with `text`,
    /// ignoring case, ordered by word. A title appears once per such word.
    pub fn titles_with_word(&self, text: &str) -> Vec<Arc<str>> {
        let folded = fold(text);
        let shelf = self.shelf.read();
        shelf
            .words
            .range(from_folded(&folded))
            .take_while(|(word, _)| word.starts_with(folded.as_str()))
            .map(|(_, title)| Arc::clone(title))
            .collect()
    }

    /// Visit titles starting with `text` (ignoring case) in result order
    /// until `visit` breaks.
    pub fn scan_prefix<F>(&self, text: &str, mut visit: F)
    where
        F: FnMut(&str, &Arc<str>) -> ControlFlow<()>,
    {
        let folded = fold(text);
        let shelf = self.shelf.read();
        for (key, title) in shelf.by_folded.range(from_folded(&folded)) {
            if !key.starts_with(folded.as_str()) || visit(key, title).is_break() {
                break;
            }
        }
    }

    /// The compressed byte range of the block starting at `offset`.
    ///
    /// A block ends where the next greater distinct offset begins. The last
    /// known block has an open end, which is also what a block whose
    /// successor has not been ingested yet looks like. Returns `None` for an
    /// offset that no entry points at.
    pub fn block_range(&self, offset: u64) -> Option<BlockRange> {
        let shelf = self.shelf.read();
        if !shelf.offsets.contains(&offset) {
            return None;
        }
        let next = shelf.offsets.range((Bound::Excluded(offset), Bound::Unbounded)).next().copied();
        Some(BlockRange::new(offset, next))
    }

    pub fn len(&self) -> usize {
        self.shelf.read().by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct blocks referenced so far.
    pub fn block_count(&self) -> usize {
        self.shelf.read().offsets.len()
    }

    pub fn is_complete(&self) -> bool {
        self.status.lock().complete()
    }

    pub fn status(&self) -> IndexStatus {
        let entries_loaded = self.len() as u64;
        IndexStatus { entries_loaded, ..self.status.lock().clone() }
    }

    /// Publish a batch of `(folded title, entry)` pairs, draining it.
    ///
    /// Returns the number of entries skipped because their title was
    /// already present (within the index or earlier in the same batch).
    pub(crate) fn publish(&self, batch: &mut Vec<(Box<str>, IndexEntry)>) -> u64 {
        if batch.is_empty() {
            return 0;
        }
        let mut duplicates = 0;
        let mut shelf = self.shelf.write();
        for (folded, entry) in batch.drain(..) {
            if shelf.by_title.contains_key(&entry.title) {
                duplicates += 1;
                continue;
            }
            shelf.offsets.insert(entry.block_offset);
            for word in later_words(&folded) {
                shelf.words.insert((Box::from(word), Arc::clone(&entry.title)));
            }
            shelf.by_folded.insert((folded, Arc::clone(&entry.title)));
            shelf.by_title.insert(Arc::clone(&entry.title), entry);
        }
        duplicates
    }

    /// Move from `Idle` to `Loading`; an index is only ever loaded once.
    pub(crate) fn start(&self) -> Result<()> {
        let mut status = self.status.lock();
        if status.state != LoadState::Idle {
            exn::bail!(ErrorKind::AlreadyLoading);
        }
        status.state = LoadState::Loading;
        Ok(())
    }

    pub(crate) fn update_status(&self, update: impl FnOnce(&mut IndexStatus)) {
        update(&mut self.status.lock());
    }
}

/// Lower bound of every `(folded, title)` key whose folded part is at least `folded`.
fn from_folded(folded: &str) -> (Bound<(Box<str>, Arc<str>)>, Bound<(Box<str>, Arc<str>)>) {
    (Bound::Included((Box::from(folded), Arc::from(""))), Bound::Unbounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_line;
    use std::sync::mpsc;
    use std::time::Duration;

    fn index_of(lines: &[&str]) -> OffsetIndex {
        let index = OffsetIndex::new();
        let mut batch = lines
            .iter()
            .enumerate()
            .map(|(i, line)| parse_line(line.as_bytes(), i as u64 + 1).unwrap().unwrap())
            .map(|entry| (fold(&entry.title).into_boxed_str(), entry))
            .collect();
        index.publish(&mut batch);
        index
    }

    fn titles(titles: Vec<Arc<str>>) -> Vec<String> {
        titles.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_lookup_exact() {
        let index = index_of(&["100:1:Cat", "100:2:Dog", "250:3:Elephant"]);
        let dog = index.lookup_exact("Dog").unwrap();
        assert_eq!((dog.article_id, dog.block_offset), (2, 100));
        assert_eq!(index.lookup_exact("dog"), None);
        assert_eq!(index.lookup_exact("Giraffe"), None);
        assert_eq!(index.len(), 3);
        assert_eq!(index.block_count(), 2);
    }

    #[test]
    fn test_lookup_exact_folded() {
        let index = index_of(&["1:1:Cat", "1:2:CAT", "1:3:Cats", "1:4:cat"]);
        let found: Vec<u64> = index.lookup_exact_folded("cAt").iter().map(|e| e.article_id).collect();
        // Ordered by title once the folded forms tie: "CAT" < "Cat" < "cat".
        assert_eq!(found, vec![2, 1, 4]);
    }

    #[test]
    fn test_lookup_prefix_order_and_limit() {
        let index = index_of(&["1:1:Catapult", "1:2:cat", "1:3:Dog", "1:4:Cat", "1:5:Catalonia", "1:6:Ca"]);
        assert_eq!(titles(index.lookup_prefix("ca", 10)), ["Ca", "Cat", "cat", "Catalonia", "Catapult"]);
        assert_eq!(titles(index.lookup_prefix("CAT", 2)), ["Cat", "cat"]);
        assert!(index.lookup_prefix("zebra", 10).is_empty());
        assert!(index.lookup_prefix("ca", 0).is_empty());
    }

    #[test]
    fn test_block_range() {
        let index = index_of(&["100:1:Cat", "100:2:Dog", "250:3:Elephant", "600:4:Fox"]);
        assert_eq!(index.block_range(100), Some(BlockRange::new(100, 250)));
        assert_eq!(index.block_range(250), Some(BlockRange::new(250, 600)));
        assert_eq!(index.block_range(600), Some(BlockRange::new(600, None)));
        assert_eq!(index.block_range(101), None);
    }

    #[test]
    fn test_block_range_out_of_order_source() {
        let index = index_of(&["600:4:Fox", "100:1:Cat", "250:3:Elephant"]);
        assert_eq!(index.block_range(100), Some(BlockRange::new(100, 250)));
        assert_eq!(index.block_range(250), Some(BlockRange::new(250, 600)));
    }

    #[test]
    fn test_first_title_wins() {
        let index = index_of(&["100:1:Cat", "250:9:Cat"]);
        assert_eq!(index.lookup_exact("Cat").unwrap().article_id, 1);
        assert_eq!(index.len(), 1);
        // The losing duplicate contributes no block boundary.
        assert_eq!(index.block_range(250), None);
    }

    #[test]
    fn test_scan_titles_early_stop() {
        let index = index_of(&["1:1:Bee", "1:2:ant", "1:3:Cow", "1:4:Dog"]);
        let mut seen = Vec::new();
        index.scan_titles(|folded, title| {
            seen.push((folded.to_string(), title.to_string()));
            if seen.len() == 2 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        });
        assert_eq!(seen, [("ant".to_string(), "ant".to_string()), ("bee".to_string(), "Bee".to_string())]);
    }

    #[test]
    fn test_scan_titles_across_chunks() {
        let lines: Vec<String> = (0..10).map(|i| format!("1:{i}:Title {i}")).collect();
        let index = index_of(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        let mut seen = Vec::new();
        index.scan_titles_chunked(3, |_, title| {
            seen.push(title.to_string());
            ControlFlow::Continue(())
        });
        assert_eq!(seen, lines.iter().map(|line| line[line.rfind(':').unwrap() + 1..].to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn test_scan_titles_lets_writer_in() {
        let index = Arc::new(index_of(&["1:1:Ant", "1:2:Bee", "1:3:Cow"]));
        let (started, go) = mpsc::channel();
        let (published, done) = mpsc::channel();
        let writer = {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                go.recv().unwrap();
                let entry = parse_line(b"2:4:Zebra", 4).unwrap().unwrap();
                index.publish(&mut vec![(fold(&entry.title).into_boxed_str(), entry)]);
                published.send(()).unwrap();
            })
        };
        let mut seen = Vec::new();
        index.scan_titles_chunked(1, |_, title| {
            if seen.is_empty() {
                started.send(()).unwrap();
                // Give the writer time to queue on the lock.
                std::thread::sleep(Duration::from_millis(200));
            } else if seen.len() == 1 {
                // Only possible if the writer got the lock between chunks.
                done.recv_timeout(Duration::from_secs(5)).unwrap();
            }
            seen.push(title.to_string());
            ControlFlow::Continue(())
        });
        writer.join().unwrap();
        // Zebra sorts after the scan position, so the scan still reaches it.
        assert_eq!(seen, ["Ant", "Bee", "Cow", "Zebra"]);
    }

    #[test]
    fn test_titles_with_word() {
        let index = index_of(&["1:1:Black cat", "1:2:Cat", "1:3:Felis (catus)", "1:4:Bobcat", "1:5:Cat and cattle"]);
        assert_eq!(titles(index.titles_with_word("CAT")), ["Black cat", "Cat and cattle", "Felis (catus)"]);
        assert!(index.titles_with_word("dog").is_empty());
    }

    #[test]
    fn test_scan_prefix() {
        let index = index_of(&["1:1:Cab", "1:2:Cat", "1:3:Dog", "1:4:ca"]);
        let mut seen = Vec::new();
        index.scan_prefix("CA", |_, title| {
            seen.push(title.to_string());
            ControlFlow::Continue(())
        });
        assert_eq!(seen, ["ca", "Cab", "Cat"]);
        let mut first = None;
        index.scan_prefix("c", |_, title| {
            first = Some(title.to_string());
            ControlFlow::Break(())
        });
        assert_eq!(first.as_deref(), Some("ca"));
    }

    #[test]
    fn test_start_only_once() {
        let index = OffsetIndex::new();
        assert_eq!(index.status().state, LoadState::Idle);
        index.start().unwrap();
        assert_eq!(*index.start().unwrap_err(), ErrorKind::AlreadyLoading);
        assert_eq!(index.status().state, LoadState::Loading);
    }
}

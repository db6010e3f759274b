use crate::error::{ErrorKind, Result};
use crate::lru::Lru;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Flights<K, V> = Mutex<HashMap<K, Flight<V>>>;

/// One in-progress computation and the number of callers taking part in it.
struct Flight<V> {
    cell: Arc<OnceCell<V>>,
    participants: usize,
}

/// A bounded LRU cache shared between tasks, computing missing values at
/// most once at a time per key.
///
/// Values are cloned out of the cache, so store cheaply cloned values
/// (`Arc<T>`). The recency list is guarded by a mutex held only for the
/// constant-time map operations; it is never held across an `.await`.
pub struct ArticleCache<K, V> {
    entries: Mutex<Lru<K, V>>,
    flights: Flights<K, V>,
}
impl<K, V> ArticleCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    /// # Errors
    /// [`CapacityMisconfigured`](ErrorKind::CapacityMisconfigured) if
    /// `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        let Some(capacity) = NonZeroUsize::new(capacity) else {
            exn::bail!(ErrorKind::CapacityMisconfigured(capacity));
        };
        Ok(Self { entries: Mutex::new(Lru::new(capacity)), flights: Mutex::new(HashMap::new()) })
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Get a cached value, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    /// Insert a value, evicting the least recently used entry if full.
    pub fn insert(&self, key: K, value: V) {
        if let Some((evicted, _)) = self.entries.lock().insert(key, value) {
            tracing::debug!(key = ?evicted, "evicted least recently used entry");
        }
    }

    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.entries.lock().remove(key)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Return the cached value for `key`, or compute, cache and return it.
    ///
    /// Concurrent calls for the same key share one computation: the first
    /// caller runs `compute` while the rest wait for its result. Failures are
    /// not cached; if the running computation fails (or its caller is
    /// cancelled) the next waiter computes in its place, so computations for
    /// one key never overlap. Distinct keys never wait on each other.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            tracing::debug!(?key, "cache hit");
            return Ok(value);
        }
        let cell = {
            let mut flights = self.flights.lock();
            let flight =
                flights.entry(key.clone()).or_insert_with(|| Flight { cell: Arc::default(), participants: 0 });
            flight.participants += 1;
            Arc::clone(&flight.cell)
        };
        let guard = FlightGuard { flights: &self.flights, key: &key, cell };
        let value = guard
            .cell
            .get_or_try_init(|| async {
                // A flight that finished between our miss and joining this one
                // has already filled the cache.
                if let Some(value) = self.get(&key) {
                    return Ok(value);
                }
                tracing::debug!(?key, "cache miss, computing");
                let value = compute().await?;
                self.insert(key.clone(), value.clone());
                Ok(value)
            })
            .await?;
        Ok(value.clone())
    }
}

/// Retires a flight from the in-flight table once it is no longer needed.
///
/// A flight is retired as soon as it holds a value (the cache has it now),
/// or when its last participant leaves without one.
struct FlightGuard<'a, K: Hash + Eq, V> {
    flights: &'a Flights<K, V>,
    key: &'a K,
    cell: Arc<OnceCell<V>>,
}
impl<K: Hash + Eq, V> Drop for FlightGuard<'_, K, V> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock();
        // A retired flight may already have been replaced by a newer one.
        if let Some(flight) = flights.get_mut(self.key)
            && Arc::ptr_eq(&flight.cell, &self.cell)
        {
            flight.participants = flight.participants.saturating_sub(1);
            if flight.participants == 0 || self.cell.initialized() {
                flights.remove(self.key);
            }
        }
    }
}

//! Memoizing cache for asynchronous producers
//!
//! [`FetchCache::get_or_fetch`] returns the stored value for a key while it is
//! younger than the TTL and otherwise awaits the caller's producer, stores
//! what it yields and hands it back. Producer errors reach the caller
//! untouched and leave the store as it was.
//!
//! Concurrent misses on the same key are not coalesced: every caller that
//! observes a miss runs its own producer and the last one to finish wins.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::entry::{CacheEntry, CachedData};
use super::error::CacheError;
use super::matcher::KeyMatcher;
use super::store::{EntryStore, MemoryStore};
use crate::clock::{Clock, SystemClock};

/// TTL applied by [`FetchCache::get_or_fetch_default`] unless overridden
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Counters describing how a cache has been used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the store
    pub hits: u64,
    /// Calls that invoked the producer
    pub misses: u64,
    /// Producer invocations that failed
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

/// TTL-bounded memoizing cache over an [`EntryStore`]
///
/// Construct one per owning service and share it with `Arc` if several tasks
/// need it. There is no process-wide instance.
pub struct FetchCache<V, S = MemoryStore<V>> {
    store: S,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    counters: Counters,
    _value: PhantomData<fn() -> V>,
}

impl<V> FetchCache<V, MemoryStore<V>>
where
    V: Clone + Send + Sync,
{
    /// Creates a cache backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<V, S> FetchCache<V, S>
where
    V: Clone,
    S: EntryStore<V>,
{
    /// Creates a cache over `store` using the system clock
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            default_ttl: DEFAULT_TTL,
            counters: Counters::default(),
            _value: PhantomData,
        }
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the TTL used by [`get_or_fetch_default`](Self::get_or_fetch_default)
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the fresh value for `key`, or runs `producer` and stores its result
    ///
    /// A hit returns without suspending. On a miss the producer is awaited and
    /// its value is stamped with the time it resolved. A `ttl` of zero always
    /// refetches.
    ///
    /// # Errors
    /// Returns the producer's own error. The store is not modified in that case.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, ttl: Duration, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup_fresh(key, ttl) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "cache hit");
            return Ok(value);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, ttl_ms = ttl.as_millis() as u64, "cache miss, invoking producer");

        let value = match producer().await {
            Ok(value) => value,
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                debug!(key, "producer failed, store left unchanged");
                return Err(e);
            }
        };

        let entry = CacheEntry::new(value.clone(), self.clock.now());
        if let Err(e) = self.store.save(key, entry) {
            warn!(key, error = %e, "failed to store fetched value");
        }

        Ok(value)
    }

    /// [`get_or_fetch`](Self::get_or_fetch) with this cache's default TTL
    pub async fn get_or_fetch_default<F, Fut, E>(&self, key: &str, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_fetch(key, self.default_ttl, producer).await
    }

    /// Reads the entry for `key` without running a producer
    ///
    /// Expired entries are returned too, flagged with `is_expired`, so callers
    /// can fall back to the last known value when a refresh fails.
    pub fn peek(&self, key: &str, ttl: Duration) -> Option<CachedData<V>> {
        let entry = self.load_logged(key)?;
        Some(entry.into_cached(self.clock.now(), ttl))
    }

    /// Stores `value` under `key`, stamped now
    pub fn insert(&self, key: &str, value: V) -> Result<(), CacheError> {
        self.store.save(key, CacheEntry::new(value, self.clock.now()))
    }

    /// Removes the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.store.remove(key)?;
        debug!(key, removed, "invalidated key");
        Ok(removed)
    }

    /// Removes every entry whose key `matcher` accepts. Returns how many were removed.
    pub fn invalidate_matching<M>(&self, matcher: &M) -> Result<usize, CacheError>
    where
        M: KeyMatcher,
    {
        let removed = self.store.remove_matching(matcher)?;
        debug!(removed, "invalidated matching keys");
        Ok(removed)
    }

    /// Removes every entry
    pub fn clear(&self) -> Result<(), CacheError> {
        self.store.clear()?;
        debug!("cache cleared");
        Ok(())
    }

    /// Keys currently stored, fresh or stale
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.store.keys()
    }

    /// Number of stored entries, fresh or stale
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.store.keys()?.len())
    }

    /// Snapshot of the hit/miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    fn lookup_fresh(&self, key: &str, ttl: Duration) -> Option<V> {
        let entry = self.load_logged(key)?;
        entry
            .is_fresh(self.clock.now(), ttl)
            .then_some(entry.value)
    }

    /// Store read where a failure counts as absent
    fn load_logged(&self, key: &str) -> Option<CacheEntry<V>> {
        match self.store.load(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "failed to read cache entry, treating as miss");
                None
            }
        }
    }
}

impl<V, S> std::fmt::Debug for FetchCache<V, S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache")
            .field("store", &self.store)
            .field("clock", &self.clock)
            .field("default_ttl", &self.default_ttl)
            .field("counters", &self.counters)
            .finish()
    }
}

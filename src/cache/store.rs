//! Storage backends for cache entries
//!
//! A [`FetchCache`](super::FetchCache) owns exactly one store. The in-memory
//! store lives as long as the process; the disk store (see `disk.rs`) keeps
//! entries until they are explicitly removed.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::entry::CacheEntry;
use super::error::CacheError;
use super::matcher::KeyMatcher;

/// Key to entry mapping backing a cache
///
/// Each method is atomic on its own. Callers must not rely on atomicity
/// across two calls.
pub trait EntryStore<V>: Send + Sync {
    /// Returns the entry stored under `key`, fresh or not
    fn load(&self, key: &str) -> Result<Option<CacheEntry<V>>, CacheError>;

    /// Writes `entry` under `key`, replacing any previous entry
    fn save(&self, key: &str, entry: CacheEntry<V>) -> Result<(), CacheError>;

    /// Removes the entry for `key`. Returns whether one existed.
    fn remove(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every entry whose key the matcher accepts
    fn remove_matching(&self, matcher: &dyn KeyMatcher) -> Result<usize, CacheError>;

    /// Removes every entry
    fn clear(&self) -> Result<(), CacheError>;

    /// Lists stored keys in no particular order
    fn keys(&self) -> Result<Vec<String>, CacheError>;
}

/// Process-local store guarded by a read/write lock
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> EntryStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync,
{
    fn load(&self, key: &str) -> Result<Option<CacheEntry<V>>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn save(&self, key: &str, entry: CacheEntry<V>) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn remove_matching(&self, matcher: &dyn KeyMatcher) -> Result<usize, CacheError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !matcher.matches(key));
        Ok(before - entries.len())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

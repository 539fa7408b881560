//! Stored entries and freshness rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A value together with the instant it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The cached payload
    pub value: V,
    /// When the payload was stored
    pub stored_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, stored_at: DateTime<Utc>) -> Self {
        Self { value, stored_at }
    }

    /// Whether the entry is still fresh at `now` for the given TTL
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        is_fresh(self.stored_at, now, ttl)
    }

    /// Converts the entry into a stale-read result
    pub fn into_cached(self, now: DateTime<Utc>, ttl: Duration) -> CachedData<V> {
        let is_expired = !self.is_fresh(now, ttl);
        CachedData {
            data: self.value,
            cached_at: self.stored_at,
            is_expired,
        }
    }
}

/// Result of a stale read, including metadata about cache freshness
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<V> {
    /// The cached data
    pub data: V,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the entry had expired at read time
    pub is_expired: bool,
}

impl<V> CachedData<V> {
    /// Age of the data relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.cached_at
    }
}

/// `now - stored_at < ttl`. A TTL too large for chrono never expires.
pub fn is_fresh(stored_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now - stored_at < ttl,
        Err(_) => true,
    }
}

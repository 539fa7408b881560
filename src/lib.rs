//! fetchcache library
//!
//! A TTL memoizing cache for async fetches ([`FetchCache`]) with in-memory and
//! on-disk stores, canonical key construction and a JSON HTTP producer. The
//! CLI modules are exposed for use in integration tests.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod http;
pub mod key;

pub use cache::{
    CacheEntry, CacheError, CacheStats, CachedData, DiskStore, EntryStore, FetchCache,
    KeyMatcher, MemoryStore, Prefix,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{CacheKey, Namespace};

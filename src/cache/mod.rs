//! TTL memoizing cache for asynchronous fetches
//!
//! [`FetchCache`] wraps an async producer behind a keyed store: a value younger
//! than the TTL is returned directly, anything else triggers the producer and
//! the result is stored. Two stores are provided, an in-memory map and a
//! directory of JSON files for entries that should outlive the process.

mod disk;
mod entry;
mod error;
mod manager;
mod matcher;
mod store;

pub use disk::{default_cache_dir, DiskStore};
pub use entry::{CacheEntry, CachedData};
pub use error::CacheError;
pub use manager::{CacheStats, FetchCache, DEFAULT_TTL};
pub use matcher::{KeyMatcher, Prefix};
pub use store::{EntryStore, MemoryStore};

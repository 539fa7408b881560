//! Errors raised by cache stores and key construction

use thiserror::Error;

/// Errors that can occur while reading or writing cache entries
///
/// Producer failures are never wrapped in this type: `get_or_fetch` hands
/// them back to the caller as-is.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing storage failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be encoded or decoded
    #[error("Failed to (de)serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A key was built from an empty namespace
    #[error("Cache key namespace must not be empty")]
    EmptyKey,
}

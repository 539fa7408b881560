//! Runtime configuration for the fetchcache binary

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{default_cache_dir, DEFAULT_TTL};
use crate::cli::Cli;
use crate::http::DEFAULT_TIMEOUT;

/// Settings derived from CLI flags and environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Explicit cache directory; `None` uses the XDG cache directory
    pub cache_dir: Option<PathBuf>,
    /// How long a stored response is served without refetching
    pub default_ttl: Duration,
    /// HTTP request timeout
    pub http_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            default_ttl: DEFAULT_TTL,
            http_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Creates a CacheConfig from parsed CLI arguments, keeping defaults for unset flags
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: cli.cache_dir.clone(),
            default_ttl: cli
                .ttl_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_ttl),
            http_timeout: cli
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.http_timeout),
        }
    }

    /// Directory entries are stored in
    ///
    /// Returns `None` when no directory was configured and no home directory exists.
    pub fn resolve_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(default_cache_dir)
    }
}

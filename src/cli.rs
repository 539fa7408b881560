//! Command-line interface parsing for fetchcache
//!
//! This module handles parsing of CLI arguments using clap and turns the
//! loosely-typed `invalidate` flags into a single [`InvalidateTarget`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use regex::Regex;
use thiserror::Error;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// `invalidate` was called without saying what to remove
    #[error("Nothing to invalidate: pass a KEY, --pattern <REGEX> or --prefix <PREFIX>")]
    MissingTarget,

    /// More than one of KEY, --pattern and --prefix was given
    #[error("Pass only one of KEY, --pattern or --prefix")]
    ConflictingTargets,

    /// The --pattern value is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// fetchcache - Fetch JSON endpoints through a TTL cache
#[derive(Parser, Debug)]
#[command(name = "fetchcache")]
#[command(about = "Fetch JSON endpoints through an on-disk TTL cache and manage its entries")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache entries (defaults to the XDG cache directory)
    #[arg(long, global = true, env = "FETCHCACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// How long a stored response stays fresh, in milliseconds (0 = always refetch)
    #[arg(long, global = true, env = "FETCHCACHE_TTL_MS", value_name = "MILLIS")]
    pub ttl_ms: Option<u64>,

    /// HTTP request timeout in milliseconds
    #[arg(long, global = true, value_name = "MILLIS")]
    pub timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch a JSON document, serving it from the cache while fresh
    Get {
        /// URL to GET
        url: String,
        /// Cache key to store the response under (defaults to one derived from the URL)
        #[arg(long)]
        key: Option<String>,
        /// Print the last stored response if the fetch fails
        #[arg(long)]
        stale_fallback: bool,
    },

    /// Show a stored entry, fresh or stale
    Show {
        /// Cache key
        key: String,
    },

    /// List stored keys with their age
    List,

    /// Remove one entry or a family of entries
    ///
    /// Examples:
    ///   fetchcache invalidate 'odds?sport=nba'
    ///   fetchcache invalidate --pattern '^odds'
    ///   fetchcache invalidate --prefix analytics
    Invalidate {
        /// Exact cache key
        key: Option<String>,
        /// Remove every key matching this regular expression
        #[arg(long, value_name = "REGEX")]
        pattern: Option<String>,
        /// Remove every key starting with this prefix
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<String>,
    },

    /// Remove every entry
    Clear,
}

/// What an `invalidate` command removes
#[derive(Debug, Clone)]
pub enum InvalidateTarget {
    Key(String),
    Pattern(Regex),
    Prefix(String),
}

impl InvalidateTarget {
    /// Validates the `invalidate` arguments
    ///
    /// # Returns
    /// * `Ok(InvalidateTarget)` if exactly one target was given
    /// * `Err(CliError)` if none or several were given, or the pattern is invalid
    pub fn from_args(
        key: Option<&str>,
        pattern: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<Self, CliError> {
        match (key, pattern, prefix) {
            (Some(key), None, None) => Ok(Self::Key(key.to_string())),
            (None, Some(pattern), None) => parse_pattern_arg(pattern).map(Self::Pattern),
            (None, None, Some(prefix)) => Ok(Self::Prefix(prefix.to_string())),
            (None, None, None) => Err(CliError::MissingTarget),
            _ => Err(CliError::ConflictingTargets),
        }
    }
}

/// Compiles a --pattern argument
pub fn parse_pattern_arg(pattern: &str) -> Result<Regex, CliError> {
    Regex::new(pattern).map_err(|source| CliError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

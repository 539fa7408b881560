//! fetchcache - Fetch JSON endpoints through an on-disk TTL cache
//!
//! `get` serves a stored response while it is fresh and refetches otherwise;
//! the remaining subcommands inspect and prune the cache directory.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::Value;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fetchcache::cli::{Cli, Command, InvalidateTarget};
use fetchcache::config::CacheConfig;
use fetchcache::http::JsonClient;
use fetchcache::{CacheKey, CachedData, DiskStore, FetchCache, Prefix};

type JsonCache = FetchCache<Value, DiskStore<Value>>;

/// Sets up stderr logging, honouring `RUST_LOG` when present
fn init_logging(verbose: bool) {
    let filter = if verbose {
        "fetchcache=debug,warn"
    } else {
        "fetchcache=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Key used for a URL when none is given
fn default_key(url: &str) -> Result<String> {
    Ok(CacheKey::new("http")?.param("url", url).render())
}

fn status_label(cached: &CachedData<Value>) -> &'static str {
    if cached.is_expired {
        "STALE"
    } else {
        "FRESH"
    }
}

async fn cmd_get(
    cache: &JsonCache,
    config: &CacheConfig,
    url: &str,
    key: Option<String>,
    stale_fallback: bool,
) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => default_key(url)?,
    };
    let client = JsonClient::new(config.http_timeout)?;

    let value = match cache
        .get_or_fetch_default(&key, || client.fetch_json(url))
        .await
    {
        Ok(value) => value,
        Err(e) if stale_fallback => match cache.peek(&key, cache.default_ttl()) {
            Some(cached) => {
                warn!(key = %key, error = %e, cached_at = %cached.cached_at, "fetch failed, serving last stored response");
                cached.data
            }
            None => return Err(e).with_context(|| format!("fetching {} (no stored response)", url)),
        },
        Err(e) => return Err(e).with_context(|| format!("fetching {}", url)),
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_show(cache: &JsonCache, key: &str) -> Result<()> {
    let Some(cached) = cache.peek(key, cache.default_ttl()) else {
        bail!("no entry for key '{}'", key);
    };

    println!("key:       {}", key);
    println!("file:      {}", cache.store().entry_path(key).display());
    println!("stored_at: {}", cached.cached_at.to_rfc3339());
    println!("age_ms:    {}", cached.age(Utc::now()).num_milliseconds());
    println!("status:    {}", status_label(&cached));
    println!("{}", serde_json::to_string_pretty(&cached.data)?);
    Ok(())
}

fn cmd_list(cache: &JsonCache) -> Result<()> {
    let mut keys = cache.keys()?;
    keys.sort();

    let now = Utc::now();
    for key in keys {
        match cache.peek(&key, cache.default_ttl()) {
            Some(cached) => println!(
                "{}\t{}ms\t{}",
                status_label(&cached),
                cached.age(now).num_milliseconds(),
                key
            ),
            None => println!("UNREADABLE\t-\t{}", key),
        }
    }
    Ok(())
}

fn cmd_invalidate(cache: &JsonCache, target: InvalidateTarget) -> Result<()> {
    let removed = match target {
        InvalidateTarget::Key(key) => usize::from(cache.invalidate(&key)?),
        InvalidateTarget::Pattern(re) => cache.invalidate_matching(&re)?,
        InvalidateTarget::Prefix(prefix) => cache.invalidate_matching(&Prefix::new(prefix))?,
    };
    println!("removed {} entr{}", removed, if removed == 1 { "y" } else { "ies" });
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = CacheConfig::from_cli(&cli);
    let cache_dir = config
        .resolve_cache_dir()
        .context("could not determine a cache directory; pass --cache-dir")?;
    let cache: JsonCache =
        FetchCache::new(DiskStore::with_dir(cache_dir)).with_default_ttl(config.default_ttl);

    match cli.command {
        Command::Get {
            url,
            key,
            stale_fallback,
        } => cmd_get(&cache, &config, &url, key, stale_fallback).await,
        Command::Show { key } => cmd_show(&cache, &key),
        Command::List => cmd_list(&cache),
        Command::Invalidate {
            key,
            pattern,
            prefix,
        } => {
            let target =
                InvalidateTarget::from_args(key.as_deref(), pattern.as_deref(), prefix.as_deref())?;
            cmd_invalidate(&cache, target)
        }
        Command::Clear => {
            cache.clear()?;
            println!("cache cleared");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    run(cli).await
}

//! Store that persists entries to disk
//!
//! Each entry is written as a JSON file in an XDG-compliant cache directory
//! (`~/.cache/fetchcache/` on Linux). Files are named `entry-<blake3 of key>.json`
//! so keys of any length map to short, valid file names. The key itself is
//! stored inside the file and is read back for listing and pattern removal.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so a concurrent reader sees either the old or the new
//! entry and never a partial one.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use super::entry::CacheEntry;
use super::error::CacheError;
use super::matcher::KeyMatcher;
use super::store::EntryStore;

const ENTRY_PREFIX: &str = "entry-";
const ENTRY_SUFFIX: &str = ".json";

/// On-disk layout of one entry
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry<K, V> {
    key: K,
    value: V,
    stored_at: DateTime<Utc>,
}

/// Just the key of a persisted entry
#[derive(Deserialize)]
struct PersistedKey {
    key: String,
}

/// Reads and writes cache entries as JSON files
pub struct DiskStore<V> {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    _value: PhantomData<fn() -> V>,
}

impl<V> std::fmt::Debug for DiskStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStore")
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

impl<V> Clone for DiskStore<V> {
    fn clone(&self) -> Self {
        Self::with_dir(self.cache_dir.clone())
    }
}

impl<V> DiskStore<V> {
    /// Creates a store in the XDG cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        default_cache_dir().map(Self::with_dir)
    }

    /// Creates a store rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            _value: PhantomData,
        }
    }

    /// Directory holding the entry files
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the file holding the entry for `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let digest = blake3::hash(key.as_bytes());
        self.cache_dir
            .join(format!("{}{}{}", ENTRY_PREFIX, digest.to_hex(), ENTRY_SUFFIX))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Lists every entry file. A missing directory is empty.
    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let dir = match fs::read_dir(&self.cache_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for item in dir {
            let path = item?.path();
            if is_entry_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Lists `(key, path)` for every entry file whose key can be read
    fn keyed_entry_files(&self) -> Result<Vec<(String, PathBuf)>, CacheError> {
        Ok(self
            .entry_files()?
            .into_iter()
            .filter_map(|path| read_key(&path).map(|key| (key, path)))
            .collect())
    }
}

/// XDG cache directory for this application
pub fn default_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "fetchcache")?;
    Some(project_dirs.cache_dir().to_path_buf())
}

fn is_entry_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(ENTRY_PREFIX) && name.ends_with(ENTRY_SUFFIX))
        .unwrap_or(false)
}

/// Reads the key stored in an entry file. Unreadable files yield `None`.
fn read_key(path: &Path) -> Option<String> {
    let parsed = fs::read_to_string(path)
        .map_err(CacheError::from)
        .and_then(|content| Ok(serde_json::from_str::<PersistedKey>(&content)?));
    match parsed {
        Ok(persisted) => Some(persisted.key),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable cache file");
            None
        }
    }
}

fn remove_file(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl<V> EntryStore<V> for DiskStore<V>
where
    V: Serialize + DeserializeOwned,
{
    fn load(&self, key: &str) -> Result<Option<CacheEntry<V>>, CacheError> {
        let content = match fs::read_to_string(self.entry_path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: PersistedEntry<String, V> = serde_json::from_str(&content)?;
        if entry.key != key {
            return Ok(None);
        }
        Ok(Some(CacheEntry::new(entry.value, entry.stored_at)))
    }

    fn save(&self, key: &str, entry: CacheEntry<V>) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let persisted = PersistedEntry {
            key,
            value: &entry.value,
            stored_at: entry.stored_at,
        };
        let json = serde_json::to_string_pretty(&persisted)?;

        let mut file = NamedTempFile::new_in(&self.cache_dir)?;
        file.write_all(json.as_bytes())?;
        file.persist(self.entry_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        remove_file(&self.entry_path(key))
    }

    fn remove_matching(&self, matcher: &dyn KeyMatcher) -> Result<usize, CacheError> {
        let mut removed = 0;
        for (key, path) in self.keyed_entry_files()? {
            if matcher.matches(&key) && remove_file(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn clear(&self) -> Result<(), CacheError> {
        for path in self.entry_files()? {
            remove_file(&path)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self
            .keyed_entry_files()?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }
}

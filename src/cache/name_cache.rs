//! Persistent Name Cache
//!
//! Maps catalog ids to display names, backed by a JSON file that survives
//! restarts. Misses are resolved through a [`NameFetcher`] and written back
//! to disk every few misses and on an explicit flush.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::fetch::{FetchError, NameFetcher};
use crate::id::CatalogId;

/// Default cache file, relative to the working directory
pub const DEFAULT_CACHE_FILE: &str = "mal_name_cache.json";

/// Default number of misses between scheduled flushes
pub const DEFAULT_WRITE_EVERY: u32 = 5;

/// Cache file errors that cannot be recovered by starting empty
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Counters since the cache was opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Flushes triggered by the miss countdown
    pub scheduled_flushes: u64,
    /// Explicit calls to `flush`
    pub flushes: u64,
}

/// Id → name cache with a JSON file behind it
pub struct NameCache<F> {
    /// Backing file
    path: PathBuf,
    fetcher: F,
    /// Keyed by the decimal form of the id; sorted so the file diffs cleanly
    items: BTreeMap<String, String>,
    write_every: u32,
    /// Misses left until the next scheduled flush
    countdown: u32,
    /// Entries added since the last successful write
    dirty: bool,
    stats: CacheStats,
}

impl<F: NameFetcher> NameCache<F> {
    /// Open the cache at `path`, flushing every [`DEFAULT_WRITE_EVERY`] misses
    pub fn open(path: impl Into<PathBuf>, fetcher: F) -> Result<Self, CacheError> {
        Self::with_write_every(path, fetcher, DEFAULT_WRITE_EVERY)
    }

    /// Open the cache with a custom flush period
    ///
    /// A missing file is created and a malformed one is replaced by an empty
    /// map. Only I/O failures other than "not found" are errors.
    pub fn with_write_every(
        path: impl Into<PathBuf>,
        fetcher: F,
        write_every: u32,
    ) -> Result<Self, CacheError> {
        let path = path.into();
        let items = load(&path)?;
        let write_every = write_every.max(1);

        let cache = Self {
            path,
            fetcher,
            items,
            write_every,
            countdown: write_every,
            dirty: false,
            stats: CacheStats::default(),
        };

        // Normalize the file: creates it when missing, clears it when corrupt.
        cache.write_file()?;

        info!(
            path = %cache.path.display(),
            entries = cache.items.len(),
            write_every = write_every,
            "Name cache loaded"
        );

        Ok(cache)
    }

    /// Resolve an id to its name, fetching it on a miss
    ///
    /// Hits never fail. A failed fetch leaves no entry behind.
    pub fn resolve(&mut self, id: CatalogId) -> Result<String, FetchError> {
        let key = id.key();
        if let Some(name) = self.items.get(&key) {
            self.stats.hits += 1;
            trace!(id = %id, "Cache HIT");
            return Ok(name.clone());
        }

        self.stats.misses += 1;
        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = self.write_every;
            self.scheduled_flush();
        }

        info!(id = %id, "Cache MISS, downloading name");
        let name = self.fetcher.fetch(id)?;
        self.items.insert(key, name.clone());
        self.dirty = true;
        Ok(name)
    }

    fn scheduled_flush(&mut self) {
        self.stats.scheduled_flushes += 1;
        match self.write_file() {
            Ok(()) => self.dirty = false,
            Err(e) => warn!(error = %e, "Scheduled cache flush failed"),
        }
    }
}

impl<F> NameCache<F> {
    /// Whether `id` is cached. Never fetches.
    pub fn contains(&self, id: CatalogId) -> bool {
        self.items.contains_key(&id.key())
    }

    /// Cached name for `id`, if any. Never fetches.
    pub fn get(&self, id: CatalogId) -> Option<&str> {
        self.items.get(&id.key()).map(String::as_str)
    }

    /// Snapshot of the cached keys
    ///
    /// Later inserts are not reflected; call again for a fresh sequence.
    pub fn ids(&self) -> std::vec::IntoIter<String> {
        self.items.keys().cloned().collect::<Vec<_>>().into_iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole map to the backing file
    pub fn flush(&mut self) -> Result<(), CacheError> {
        self.write_file()?;
        self.dirty = false;
        self.stats.flushes += 1;
        debug!(path = %self.path.display(), entries = self.items.len(), "Flushed name cache");
        Ok(())
    }

    /// Serialize as 4-space indented JSON and replace the file atomically
    fn write_file(&self) -> Result<(), CacheError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.items.serialize(&mut serializer)?;

        let write_err = |source| CacheError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(&buf).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        Ok(())
    }
}

impl<F> Drop for NameCache<F> {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        match self.write_file() {
            Ok(()) => debug!(path = %self.path.display(), "Flushed unsaved names on drop"),
            Err(e) => warn!(error = %e, "Failed to flush name cache on drop"),
        }
    }
}

/// Read the cache file, treating a missing or malformed file as empty
fn load(path: &Path) -> Result<BTreeMap<String, String>, CacheError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No cache file yet, starting empty");
            return Ok(BTreeMap::new());
        }
        Err(source) => {
            return Err(CacheError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_slice(&contents) {
        Ok(items) => Ok(items),
        Err(e) => {
            // An empty file is the normal result of a crash before first write.
            if !contents.iter().all(u8::is_ascii_whitespace) {
                warn!(path = %path.display(), error = %e, "Discarding malformed cache file");
            }
            Ok(BTreeMap::new())
        }
    }
}

//! Storage Module
//!
//! Key/value persistence underneath the cache store. Values are opaque
//! strings; the cache store owns encoding and namespacing.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::error::{DashboardError, Result};

/// File name used by [`FileStorage`] inside its directory.
pub const STORAGE_FILE_NAME: &str = "cache.json";

// == Storage Trait ==
/// String key/value persistence with whole-namespace enumeration.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`, failing with [`DashboardError::Storage`]
    /// when the backend cannot hold it.
    fn set_item(&self, key: &str, value: String) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;

    /// Removes every key in `keys` as one mutation and returns how many
    /// were present.
    fn remove_items(&self, keys: &[String]) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            if self.get_item(key)?.is_some() {
                self.remove_item(key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Lists every stored key, regardless of namespace.
    fn keys(&self) -> Result<Vec<String>>;

    /// Blocks until every accepted mutation is durable.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| DashboardError::Storage("storage lock poisoned".to_string()))
}

fn write_lock<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| DashboardError::Storage("storage lock poisoned".to_string()))
}

fn used_bytes(items: &HashMap<String, String>) -> usize {
    items.iter().map(|(k, v)| k.len() + v.len()).sum()
}

// == Memory Storage ==
/// In-process storage with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    /// Upper bound on the summed length of keys and values
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage that rejects writes pushing it past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Returns the summed length of all keys and values.
    pub fn used_bytes(&self) -> usize {
        read_lock(&self.items).map(|items| used_bytes(&items)).unwrap_or(0)
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(read_lock(&self.items)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<()> {
        let mut items = write_lock(&self.items)?;

        if let Some(quota) = self.quota_bytes {
            let replaced = items.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let projected = used_bytes(&items) - replaced + key.len() + value.len();
            if projected > quota {
                return Err(DashboardError::Storage(format!(
                    "quota of {} bytes exceeded writing '{}'",
                    quota, key
                )));
            }
        }

        items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        write_lock(&self.items)?.remove(key);
        Ok(())
    }

    fn remove_items(&self, keys: &[String]) -> Result<usize> {
        let mut items = write_lock(&self.items)?;
        Ok(keys.iter().filter(|k| items.remove(k.as_str()).is_some()).count())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(read_lock(&self.items)?.keys().cloned().collect())
    }
}

// == File Storage ==
/// Storage persisted as a single JSON object on disk.
///
/// The whole document is mirrored in memory. Each mutation encodes a
/// numbered snapshot; inside a tokio runtime the snapshot is written on the
/// blocking pool, otherwise inline. Writes go through a temporary file and a
/// rename, and a snapshot older than the one already on disk is skipped, so
/// the file only ever moves forward.
#[derive(Debug)]
pub struct FileStorage {
    items: RwLock<HashMap<String, String>>,
    writer: Arc<SnapshotWriter>,
}

#[derive(Debug)]
struct SnapshotWriter {
    path: PathBuf,
    /// Number of the latest encoded snapshot
    generation: AtomicU64,
    /// Number of the snapshot currently on disk
    written: Mutex<u64>,
}

impl SnapshotWriter {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn write(&self, generation: u64, bytes: &[u8]) -> Result<()> {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written >= generation {
            return Ok(());
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                DashboardError::Storage(format!("cannot write {}: {}", self.path.display(), e))
            })?;

        *written = generation;
        Ok(())
    }
}

impl FileStorage {
    // == Constructor ==
    /// Opens (or creates) the storage file inside `dir`.
    ///
    /// A file that cannot be parsed is logged and replaced by an empty store.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| {
            DashboardError::Storage(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(STORAGE_FILE_NAME);
        let items = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Discarding unreadable cache file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(DashboardError::Storage(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        debug!("Opened file storage at {} ({} keys)", path.display(), items.len());

        Ok(Self {
            items: RwLock::new(items),
            writer: Arc::new(SnapshotWriter {
                path,
                generation: AtomicU64::new(0),
                written: Mutex::new(0),
            }),
        })
    }

    /// Path of the backing JSON document.
    pub fn path(&self) -> &Path {
        &self.writer.path
    }

    fn encode(&self, items: &HashMap<String, String>) -> Result<(u64, Vec<u8>)> {
        let bytes = serde_json::to_vec(items)
            .map_err(|e| DashboardError::Storage(format!("cannot encode storage: {}", e)))?;
        Ok((self.writer.next_generation(), bytes))
    }

    /// Persists a snapshot encoded under the write guard.
    ///
    /// Errors are only reported for inline writes; a background write that
    /// fails is logged and superseded by the next mutation or [`flush`].
    ///
    /// [`flush`]: Storage::flush
    fn persist(&self, generation: u64, bytes: Vec<u8>) -> Result<()> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let writer = Arc::clone(&self.writer);
                handle.spawn_blocking(move || {
                    if let Err(e) = writer.write(generation, &bytes) {
                        warn!("Background cache write failed: {}", e);
                    }
                });
                Ok(())
            }
            Err(_) => self.writer.write(generation, &bytes),
        }
    }

    #[cfg(test)]
    fn written_generation(&self) -> u64 {
        *self.writer.written.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(read_lock(&self.items)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<()> {
        let mut items = write_lock(&self.items)?;
        let previous = items.insert(key.to_string(), value);

        let outcome = self
            .encode(&items)
            .and_then(|(generation, bytes)| self.persist(generation, bytes));
        if outcome.is_err() {
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
        }
        outcome
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.remove_items(&[key.to_string()]).map(drop)
    }

    fn remove_items(&self, keys: &[String]) -> Result<usize> {
        let mut items = write_lock(&self.items)?;
        let removed: Vec<(String, String)> = keys
            .iter()
            .filter_map(|k| items.remove_entry(k.as_str()))
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }

        let outcome = self
            .encode(&items)
            .and_then(|(generation, bytes)| self.persist(generation, bytes));
        if let Err(e) = outcome {
            items.extend(removed);
            return Err(e);
        }
        Ok(removed.len())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(read_lock(&self.items)?.keys().cloned().collect())
    }

    fn flush(&self) -> Result<()> {
        let (generation, bytes) = {
            let items = read_lock(&self.items)?;
            self.encode(&items)?
        };
        self.writer.write(generation, &bytes)
    }
}

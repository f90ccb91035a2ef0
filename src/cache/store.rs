//! Cache Store Module
//!
//! TTL-stamped key/value store layered over a [`Storage`] backend. Reads
//! report freshness instead of evicting, and writes never fail the caller.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{
    CacheEntry, CacheKey, CacheStats, CachedValue, Clock, Freshness, MemoryStorage, Storage,
    SystemClock, CACHE_NAMESPACE, DEFAULT_TTL,
};
use crate::error::Result;

// == Cache Store ==
/// Shared handle to the persistent cache.
///
/// Cloning is cheap; every clone reads and writes the same storage.
/// Concurrent writers to one key follow last-write-wins.
#[derive(Clone)]
pub struct CacheStore {
    /// Backing key/value persistence
    storage: Arc<dyn Storage>,
    /// Time source for stamping and expiry checks
    clock: Arc<dyn Clock>,
    /// Prefix applied to every persisted key
    namespace: String,
    /// TTL used when a write does not carry its own
    default_ttl: Duration,
    /// Read/write counters
    stats: Arc<Mutex<CacheStats>>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a CacheStore over the given storage and clock.
    ///
    /// # Arguments
    /// * `storage` - Persistence backend
    /// * `clock` - Time source
    /// * `default_ttl` - TTL for writes without an explicit one; zero falls
    ///   back to [`DEFAULT_TTL`]
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            storage,
            clock,
            namespace: CACHE_NAMESPACE.to_string(),
            default_ttl: if default_ttl.is_zero() {
                DEFAULT_TTL
            } else {
                default_ttl
            },
            stats: Arc::new(Mutex::new(CacheStats::new())),
        }
    }

    /// In-memory store on the system clock.
    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(SystemClock),
            default_ttl,
        )
    }

    /// Replaces the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Current time according to the store's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn storage_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.namespace, key)
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }

    fn owned_keys(&self) -> Vec<String> {
        match self.storage.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&self.namespace))
                .collect(),
            Err(e) => {
                warn!("Cannot enumerate cache keys: {}", e);
                Vec::new()
            }
        }
    }

    // == Set ==
    /// Stores a value, overwriting any prior entry and resetting its expiry.
    ///
    /// A failed write triggers [`clear_expired`](Self::clear_expired) and one
    /// retry; if that also fails the write is dropped with a warning.
    ///
    /// # Arguments
    /// * `key` - The key to store under
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL (uses the default if None or zero)
    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) {
        let ttl = match ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => self.default_ttl,
        };

        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Cannot encode cache entry '{}': {}", key, e);
                self.record(CacheStats::record_write_failure);
                return;
            }
        };

        let storage_key = self.storage_key(key);
        if let Err(first) = self.storage.set_item(&storage_key, encoded.clone()) {
            let reclaimed = self.clear_expired();
            warn!(
                "Cache write for '{}' failed ({}); reclaimed {} expired entries",
                key, first, reclaimed
            );

            if let Err(second) = self.storage.set_item(&storage_key, encoded) {
                warn!("Dropping cache write for '{}': {}", key, second);
                self.record(CacheStats::record_write_failure);
                return;
            }
        }

        debug!("Cached '{}' for {}ms", key, ttl.as_millis());
        self.record(CacheStats::record_write);
    }

    fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CachedValue<T>> {
        let raw = match self.storage.get_item(&self.storage_key(key)) {
            Ok(raw) => raw?,
            Err(e) => {
                debug!("Cache read for '{}' failed: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = serde_json::from_str(&raw)
            .map_err(|e| debug!("Ignoring unparseable cache entry '{}': {}", key, e))
            .ok()?;

        Some(CachedValue {
            is_expired: entry.is_expired_at(self.clock.now_ms()),
            value: entry.value,
            stored_at: entry.stored_at,
        })
    }

    // == Get ==
    /// Retrieves a value together with its freshness flag, counting the
    /// lookup as a hit, stale hit or miss.
    ///
    /// Returns None if nothing is stored or the entry cannot be decoded as `T`.
    /// Expired entries are returned with `is_expired = true` and left in place.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CachedValue<T>> {
        let cached = self.read(key);
        match &cached {
            None => self.record(CacheStats::record_miss),
            Some(c) if c.is_expired => self.record(CacheStats::record_stale_hit),
            Some(_) => self.record(CacheStats::record_hit),
        }
        cached
    }

    /// Same as [`get`](Self::get) but leaves the statistics untouched.
    pub fn peek<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CachedValue<T>> {
        self.read(key)
    }

    // == Freshness Probe ==
    /// Reports whether a key is missing, fresh, or stale without decoding
    /// its value. Does not touch the statistics.
    pub fn freshness(&self, key: &CacheKey) -> Freshness {
        let Ok(Some(raw)) = self.storage.get_item(&self.storage_key(key)) else {
            return Freshness::Missing;
        };

        match serde_json::from_str::<CacheEntry<IgnoredAny>>(&raw) {
            Ok(entry) if entry.is_expired_at(self.clock.now_ms()) => Freshness::Stale,
            Ok(_) => Freshness::Fresh,
            Err(_) => Freshness::Missing,
        }
    }

    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        self.freshness(key) == Freshness::Fresh
    }

    // == Remove ==
    /// Removes an entry by key; no-op if absent.
    pub fn remove(&self, key: &CacheKey) {
        if let Err(e) = self.storage.remove_item(&self.storage_key(key)) {
            warn!("Cannot remove cache entry '{}': {}", key, e);
        }
    }

    fn remove_keys(&self, keys: &[String]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        self.storage.remove_items(keys).unwrap_or_else(|e| {
            warn!("Cannot remove {} cache entries: {}", keys.len(), e);
            0
        })
    }

    // == Clear All ==
    /// Removes every entry in this store's namespace.
    ///
    /// Returns the number of entries removed.
    pub fn clear_all(&self) -> usize {
        let removed = self.remove_keys(&self.owned_keys());

        debug!("Cleared {} cache entries", removed);
        removed
    }

    // == Clear Expired ==
    /// Removes expired (and undecodable) entries in this store's namespace.
    ///
    /// Returns the number of entries removed.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now_ms();

        let reclaimable: Vec<String> = self
            .owned_keys()
            .into_iter()
            .filter(|k| match self.storage.get_item(k) {
                Ok(Some(raw)) => serde_json::from_str::<CacheEntry<IgnoredAny>>(&raw)
                    .map(|entry| entry.is_expired_at(now))
                    .unwrap_or(true),
                _ => false,
            })
            .collect();

        self.remove_keys(&reclaimable)
    }

    // == Flush ==
    /// Blocks until every write accepted so far is durable in storage.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()
    }

    // == Length ==
    /// Returns the number of entries in this store's namespace.
    pub fn len(&self) -> usize {
        self.owned_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("namespace", &self.namespace)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

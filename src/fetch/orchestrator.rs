//! Cache-Aside Fetch Orchestrator
//!
//! Serves fresh cache entries directly, otherwise runs the fetch through the
//! concurrency queue, persists the result, and falls back to whatever is
//! cached when the fetch fails.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheStore, CachedValue};
use crate::error::Result;
use crate::queue::ConcurrencyQueue;

// == Fetch Options ==
/// Per-call knobs for [`Orchestrator::fetch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the fresh-cache shortcut and always do a round trip
    pub force_refresh: bool,
    /// TTL for the stored result; the store's default when None
    pub ttl: Option<Duration>,
}

impl FetchOptions {
    pub fn forced() -> Self {
        Self {
            force_refresh: true,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

// == Fetch Source ==
/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Network,
    FreshCache,
    /// Served because the round trip failed
    StaleCache,
}

// == Fetch State ==
/// Lifecycle of one orchestrator call, as reported in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    CacheFreshHit,
    Queued,
    Succeeded,
    FailedWithStaleFallback,
    FailedNoFallback,
}

impl FetchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchState::CacheFreshHit => "CACHE_FRESH_HIT",
            FetchState::Queued => "QUEUED",
            FetchState::Succeeded => "SUCCEEDED",
            FetchState::FailedWithStaleFallback => "FAILED_WITH_STALE_FALLBACK",
            FetchState::FailedNoFallback => "FAILED_NO_FALLBACK",
        }
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Fetched ==
/// A value returned by the orchestrator together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: FetchSource,
    /// Unix milliseconds at which the value was (or is being) cached
    pub stored_at: u64,
}

impl<T> Fetched<T> {
    fn from_cache(cached: CachedValue<T>) -> Self {
        Self {
            value: cached.value,
            source: if cached.is_expired {
                FetchSource::StaleCache
            } else {
                FetchSource::FreshCache
            },
            stored_at: cached.stored_at,
        }
    }

    pub fn is_from_network(&self) -> bool {
        self.source == FetchSource::Network
    }
}

// == Fetch Stats ==
/// Counters of orchestrator outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub fresh_hits: u64,
    pub network_fetches: u64,
    pub stale_fallbacks: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct FetchCounters {
    fresh_hits: AtomicU64,
    network_fetches: AtomicU64,
    stale_fallbacks: AtomicU64,
    failures: AtomicU64,
}

type FlightTable = Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>;

// == Orchestrator ==
/// Cache-aside coordinator shared by every top-level fetch.
///
/// With single-flight enabled, concurrent calls for one key are serialised
/// and late callers re-check the cache before doing their own round trip.
#[derive(Clone)]
pub struct Orchestrator {
    cache: CacheStore,
    queue: ConcurrencyQueue,
    single_flight: bool,
    flights: Arc<FlightTable>,
    counters: Arc<FetchCounters>,
}

impl Orchestrator {
    /// Creates an orchestrator with single-flight enabled.
    pub fn new(cache: CacheStore, queue: ConcurrencyQueue) -> Self {
        Self {
            cache,
            queue,
            single_flight: true,
            flights: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(FetchCounters::default()),
        }
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn queue(&self) -> &ConcurrencyQueue {
        &self.queue
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            fresh_hits: self.counters.fresh_hits.load(Ordering::Relaxed),
            network_fetches: self.counters.network_fetches.load(Ordering::Relaxed),
            stale_fallbacks: self.counters.stale_fallbacks.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    // == Fetch ==
    /// Resolves `key` cache-aside.
    ///
    /// `fetch` is only invoked when the cache cannot answer; it is expected to
    /// route its upstream work through [`queue`](Self::queue). A failed fetch
    /// is replaced by any cached value for `key`, fresh or stale, and only
    /// propagates when nothing is cached.
    ///
    /// Only the first cache lookup of a call counts towards the cache
    /// statistics; the re-check after waiting on a flight and the failure
    /// fallback read without recording.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &CacheKey,
        options: FetchOptions,
        fetch: F,
    ) -> Result<Fetched<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !options.force_refresh {
            if let Some(hit) = self.fresh_hit(key, self.cache.get::<T>(key)) {
                return Ok(hit);
            }
        }

        let _flight = if self.single_flight {
            let flight = self.board(key).await;
            if !options.force_refresh {
                if let Some(hit) = self.fresh_hit(key, self.cache.peek::<T>(key)) {
                    return Ok(hit);
                }
            }
            Some(flight)
        } else {
            None
        };

        debug!("{} {}", key, FetchState::Queued);

        match fetch().await {
            Ok(value) => {
                self.cache.set(key, &value, options.ttl);
                self.counters.network_fetches.fetch_add(1, Ordering::Relaxed);
                debug!("{} {}", key, FetchState::Succeeded);

                Ok(Fetched {
                    value,
                    source: FetchSource::Network,
                    stored_at: self.cache.now_ms(),
                })
            }
            Err(error) => match self.cache.peek::<T>(key) {
                Some(cached) => {
                    self.counters.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "{} {}: serving cached value after {}",
                        key,
                        FetchState::FailedWithStaleFallback,
                        error
                    );
                    Ok(Fetched::from_cache(cached))
                }
                None => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!("{} {}: {}", key, FetchState::FailedNoFallback, error);
                    Err(error)
                }
            },
        }
    }

    /// [`fetch`](Self::fetch) with a single operation submitted to the queue.
    pub async fn fetch_queued<T, F, Fut>(
        &self,
        key: &CacheKey,
        options: FetchOptions,
        operation: F,
    ) -> Result<Fetched<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let queue = self.queue.clone();
        self.fetch(key, options, move || queue.add(operation)).await
    }

    fn fresh_hit<T>(&self, key: &CacheKey, cached: Option<CachedValue<T>>) -> Option<Fetched<T>> {
        let cached = cached.filter(|c| !c.is_expired)?;
        self.counters.fresh_hits.fetch_add(1, Ordering::Relaxed);
        debug!("{} {}", key, FetchState::CacheFreshHit);
        Some(Fetched::from_cache(cached))
    }

    /// Waits for any in-flight fetch of `key` and takes its place.
    async fn board(&self, key: &CacheKey) -> Flight {
        let lock = {
            let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(flights.entry(key.clone()).or_default())
        };

        Flight {
            key: key.clone(),
            flights: Arc::clone(&self.flights),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn flights_in_table(&self) -> usize {
        self.flights.lock().map(|f| f.len()).unwrap_or(0)
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("cache", &self.cache)
            .field("queue", &self.queue)
            .field("single_flight", &self.single_flight)
            .finish_non_exhaustive()
    }
}

// == Flight ==
/// Exclusive claim on one key's round trip. Dropping it lets the next
/// waiter in and removes the table entry once nobody references it.
struct Flight {
    key: CacheKey,
    flights: Arc<FlightTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for Flight {
    fn drop(&mut self) {
        self.guard.take();

        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        if flights
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            flights.remove(&self.key);
        }
    }
}

//! Background Prefetch Scheduler
//!
//! Warms per-entity cache entries after a list fetch without delaying the
//! caller. Jobs run on a supervised [`JoinSet`] so shutdown and tests can
//! await them, and every job watches a [`CancellationToken`] so an abort
//! also reaches jobs a waiter has already taken out of the set.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{normalize_symbol, CacheKey};
use crate::fetch::{DashboardService, FetchOptions};
use crate::models::{PredictionMethod, StockSnapshot};

/// One independently cached piece of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PrefetchJob {
    Detail(String),
    History(String, u32),
    Predictions(String, PredictionMethod),
}

impl PrefetchJob {
    fn for_symbol(symbol: &str, history_days: u32) -> Vec<PrefetchJob> {
        let mut jobs = vec![
            PrefetchJob::Detail(symbol.to_string()),
            PrefetchJob::History(symbol.to_string(), history_days),
        ];
        jobs.extend(
            PredictionMethod::ALL
                .iter()
                .map(|method| PrefetchJob::Predictions(symbol.to_string(), *method)),
        );
        jobs
    }

    fn key(&self) -> CacheKey {
        match self {
            PrefetchJob::Detail(symbol) => CacheKey::stock_detail(symbol),
            PrefetchJob::History(symbol, days) => CacheKey::historical(symbol, *days),
            PrefetchJob::Predictions(symbol, method) => CacheKey::predictions(symbol, *method),
        }
    }

    /// Runs the fetch for its cache side effect; the outcome is dropped.
    async fn run(self, service: DashboardService) {
        let options = FetchOptions::default();
        let outcome = match &self {
            PrefetchJob::Detail(symbol) => service
                .fetch_stock_detail(symbol, options)
                .await
                .map(drop),
            PrefetchJob::History(symbol, days) => service
                .fetch_historical(symbol, Some(*days), options)
                .await
                .map(drop),
            PrefetchJob::Predictions(symbol, method) => service
                .fetch_predictions(symbol, *method, options)
                .await
                .map(drop),
        };

        if let Err(e) = outcome {
            debug!("Prefetch of {} failed: {}", self.key(), e);
        }
    }
}

/// Running jobs and the token they are cancelled through.
#[derive(Default)]
struct Tracked {
    set: JoinSet<()>,
    cancel: CancellationToken,
}

// == Prefetch Scheduler ==
#[derive(Clone)]
pub struct PrefetchScheduler {
    service: DashboardService,
    tasks: Arc<Mutex<Tracked>>,
    enabled: bool,
}

impl PrefetchScheduler {
    pub fn new(service: DashboardService) -> Self {
        Self {
            service,
            tasks: Arc::new(Mutex::new(Tracked::default())),
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Tracked> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Schedule ==
    /// Starts a refresh for every non-fresh (entity, data kind) of `stocks`
    /// and returns how many were started.
    ///
    /// Returns immediately; must be called from within a tokio runtime.
    pub fn schedule(&self, stocks: &[StockSnapshot]) -> usize {
        if !self.enabled {
            return 0;
        }

        let cache = self.service.cache();
        let history_days = self.service.history_days();
        let mut seen = HashSet::new();
        let mut started = 0;

        let mut tasks = self.lock_tasks();
        while tasks.set.try_join_next().is_some() {}
        let cancel = tasks.cancel.clone();

        for snapshot in stocks {
            let Ok(symbol) = normalize_symbol(&snapshot.stock.symbol) else {
                debug!("Skipping prefetch of invalid symbol {:?}", snapshot.stock.symbol);
                continue;
            };
            if !seen.insert(symbol.clone()) {
                continue;
            }

            for job in PrefetchJob::for_symbol(&symbol, history_days) {
                if cache.is_fresh(&job.key()) {
                    continue;
                }
                let cancel = cancel.clone();
                let service = self.service.clone();
                tasks.set.spawn(async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => debug!("Prefetch of {} cancelled", job.key()),
                        _ = job.clone().run(service) => {}
                    }
                });
                started += 1;
            }
        }

        if started > 0 {
            info!(
                "Prefetch scheduled {} refreshes for {} entities",
                started,
                seen.len()
            );
        }
        started
    }

    /// Number of jobs still running.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.lock_tasks();
        while tasks.set.try_join_next().is_some() {}
        tasks.set.len()
    }

    /// Waits until every tracked job, including ones scheduled meanwhile,
    /// has finished.
    pub async fn wait_idle(&self) {
        loop {
            let mut batch = std::mem::take(&mut self.lock_tasks().set);
            if batch.is_empty() {
                return;
            }
            while batch.join_next().await.is_some() {}
        }
    }

    /// Cancels every job started so far, including ones a concurrent
    /// [`wait_idle`](Self::wait_idle) is already awaiting. Jobs scheduled
    /// afterwards run normally.
    pub fn abort_all(&self) {
        let mut tasks = self.lock_tasks();
        if !tasks.set.is_empty() {
            info!("Aborting {} prefetch jobs", tasks.set.len());
        }
        std::mem::take(&mut tasks.cancel).cancel();
        tasks.set.abort_all();
    }
}

impl std::fmt::Debug for PrefetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchScheduler")
            .field("enabled", &self.enabled)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

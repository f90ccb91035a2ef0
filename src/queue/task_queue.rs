//! Bounded Concurrency Queue
//!
//! Admits asynchronous operations up to a fixed capacity and parks the rest
//! in strict FIFO order.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{DashboardError, Result};
use crate::queue::{QueueStats, DEFAULT_CAPACITY};

/// A parked operation. Invoked once at admission; the returned future
/// resolves to `true` when the operation failed.
type Job = Box<dyn FnOnce(&QueueInner) -> BoxFuture<'static, bool> + Send>;

// == Concurrency Queue ==
/// Shared handle to a bounded FIFO queue.
///
/// Cloning is cheap; clones share capacity and pending order.
#[derive(Clone)]
pub struct ConcurrencyQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    capacity: usize,
    /// Deadline applied to every admitted operation
    task_timeout: Option<Duration>,
    shutdown: CancellationToken,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Job>,
    active: usize,
    enqueued: u64,
    admitted: u64,
    completed: u64,
    failed: u64,
}

impl ConcurrencyQueue {
    // == Constructor ==
    /// Creates a queue running at most `capacity` operations at once.
    ///
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self::with_task_timeout(capacity, None)
    }

    /// Creates a queue whose operations fail with
    /// [`DashboardError::Timeout`] when they outlive `task_timeout`.
    pub fn with_task_timeout(capacity: usize, task_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                capacity: capacity.max(1),
                task_timeout: task_timeout.filter(|t| !t.is_zero()),
                shutdown: CancellationToken::new(),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.inner.task_timeout
    }

    // == Add ==
    /// Appends an operation and admits as many pending operations as capacity
    /// allows.
    ///
    /// The operation closure is invoked once, when the operation is admitted.
    /// The returned handle resolves with the operation's own result; a failure
    /// never affects sibling operations and always frees the slot.
    pub fn add<T, F, Fut>(&self, operation: F) -> QueueHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let job: Job = Box::new(move |inner: &QueueInner| {
            if inner.shutdown.is_cancelled() {
                let _ = tx.send(Err(DashboardError::Cancelled));
                return async { true }.boxed();
            }

            let token = inner.shutdown.clone();
            let deadline = inner.task_timeout;
            let operation = operation();

            async move {
                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(DashboardError::Cancelled),
                    result = run_with_deadline(operation, deadline) => result,
                };
                let failed = outcome.is_err();
                let _ = tx.send(outcome);
                failed
            }
            .boxed()
        });

        {
            let mut state = self.inner.lock_state();
            state.pending.push_back(job);
            state.enqueued += 1;
            debug!(
                "Queued operation (active={}, pending={})",
                state.active,
                state.pending.len()
            );
        }

        self.inner.process();
        QueueHandle { rx }
    }

    // == Stats ==
    pub fn stats(&self) -> QueueStats {
        let state = self.inner.lock_state();
        QueueStats {
            capacity: self.inner.capacity,
            active: state.active,
            pending: state.pending.len(),
            enqueued: state.enqueued,
            admitted: state.admitted,
            completed: state.completed,
            failed: state.failed,
        }
    }

    // == Shutdown ==
    /// Signals cancellation to running operations and rejects every operation
    /// admitted afterwards with [`DashboardError::Cancelled`].
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            warn!("Concurrency queue shutting down");
            self.inner.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl Default for ConcurrencyQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for ConcurrencyQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyQueue")
            .field("stats", &self.stats())
            .field("task_timeout", &self.inner.task_timeout)
            .finish()
    }
}

impl QueueInner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        // Critical sections never panic midway, so a poisoned state is intact.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Admission ==
    /// Dequeues the head while a slot is free, invoking each operation and
    /// spawning its future.
    fn process(self: &Arc<Self>) {
        loop {
            let job = {
                let mut state = self.lock_state();
                if state.active >= self.capacity {
                    return;
                }
                let Some(job) = state.pending.pop_front() else {
                    return;
                };
                state.active += 1;
                state.admitted += 1;
                job
            };

            let mut slot = ActiveSlot {
                inner: Arc::clone(self),
                failed: true,
            };
            let operation = job(&**self);

            tokio::spawn(async move {
                slot.failed = operation.await;
                drop(slot);
            });
        }
    }

    fn release(self: &Arc<Self>, failed: bool) {
        {
            let mut state = self.lock_state();
            state.active = state.active.saturating_sub(1);
            state.completed += 1;
            if failed {
                state.failed += 1;
            }
        }
        self.process();
    }
}

// == Active Slot ==
/// Holds one unit of capacity; dropping it frees the unit, including when
/// the operation panics.
struct ActiveSlot {
    inner: Arc<QueueInner>,
    failed: bool,
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.inner.release(self.failed);
    }
}

async fn run_with_deadline<T>(
    operation: impl Future<Output = Result<T>>,
    deadline: Option<Duration>,
) -> Result<T> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .unwrap_or_else(|_| Err(DashboardError::Timeout(limit))),
        None => operation.await,
    }
}

// == Queue Handle ==
/// Resolves once the queued operation has run to completion.
///
/// Resolves with [`DashboardError::TaskAborted`] if the operation panicked.
#[must_use = "a queue handle does nothing unless awaited"]
pub struct QueueHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for QueueHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(DashboardError::TaskAborted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Tracks how many operations run at once and the peak observed.
    #[derive(Default)]
    struct Gauge {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.running.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_capacity() {
        let queue = ConcurrencyQueue::new(2);
        let gauge = Arc::new(Gauge::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gauge = gauge.clone();
                queue.add(move || async move {
                    gauge.enter();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    gauge.exit();
                    Ok(i)
                })
            })
            .collect();

        let results = futures_util::future::join_all(handles).await;

        assert_eq!(
            results.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>(),
            (0..8).collect::<Vec<_>>()
        );
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
        assert!(queue.stats().is_idle());
        assert_eq!(queue.stats().completed, 8);
    }

    #[tokio::test]
    async fn test_admission_is_fifo() {
        let queue = ConcurrencyQueue::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let order = order.clone();
                queue.add(move || {
                    order.lock().unwrap().push(i);
                    async move { Ok(()) }
                })
            })
            .collect();

        // Only the head was admitted synchronously.
        assert_eq!(queue.stats().active, 1);
        assert_eq!(queue.stats().pending, 4);

        futures_util::future::join_all(handles).await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_completion_order_may_differ_from_admission() {
        let queue = ConcurrencyQueue::new(2);
        let finished = Arc::new(Mutex::new(Vec::new()));

        let slow = {
            let finished = finished.clone();
            queue.add(move || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                finished.lock().unwrap().push("slow");
                Ok(())
            })
        };
        let fast = {
            let finished = finished.clone();
            queue.add(move || async move {
                finished.lock().unwrap().push("fast");
                Ok(())
            })
        };

        let (a, b) = tokio::join!(slow, fast);
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(*finished.lock().unwrap(), vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let queue = ConcurrencyQueue::new(1);

        let failing = queue.add(|| async { Err::<u32, _>(DashboardError::Network("503".into())) });
        let healthy = queue.add(|| async { Ok(7u32) });

        assert_eq!(
            failing.await,
            Err(DashboardError::Network("503".into()))
        );
        assert_eq!(healthy.await, Ok(7));

        let stats = queue.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.active, 0);
    }

    #[tokio::test]
    async fn test_deadline_frees_slot() {
        let queue = ConcurrencyQueue::with_task_timeout(1, Some(Duration::from_millis(30)));

        let hung = queue.add(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });
        let next = queue.add(|| async { Ok("ran") });

        assert_eq!(hung.await, Err(DashboardError::Timeout(Duration::from_millis(30))));
        assert_eq!(next.await, Ok("ran"));
    }

    #[tokio::test]
    async fn test_zero_timeout_means_none() {
        let queue = ConcurrencyQueue::with_task_timeout(1, Some(Duration::ZERO));
        assert!(queue.task_timeout().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_and_pending() {
        let queue = ConcurrencyQueue::new(1);
        let pending_invoked = Arc::new(AtomicBool::new(false));

        let running = queue.add(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });
        let pending = {
            let invoked = pending_invoked.clone();
            queue.add(move || {
                invoked.store(true, Ordering::SeqCst);
                async { Ok(()) }
            })
        };

        queue.shutdown();

        assert_eq!(running.await, Err(DashboardError::Cancelled));
        assert_eq!(pending.await, Err(DashboardError::Cancelled));
        assert!(!pending_invoked.load(Ordering::SeqCst));
        assert!(queue.is_shut_down());
    }

    #[tokio::test]
    async fn test_panicking_operation_releases_slot() {
        let queue = ConcurrencyQueue::new(1);

        let panicking = queue.add(|| async {
            let missing: Option<u32> = None;
            Ok(missing.expect("operation blew up"))
        });
        let next = queue.add(|| async { Ok(1u32) });

        assert_eq!(panicking.await, Err(DashboardError::TaskAborted));
        assert_eq!(next.await, Ok(1));
        assert_eq!(queue.stats().failed, 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(ConcurrencyQueue::new(0).capacity(), 1);
        assert_eq!(ConcurrencyQueue::default().capacity(), DEFAULT_CAPACITY);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // For M tasks and capacity C, no more than C run at once and all M settle.
        #[test]
        fn prop_bounded_and_all_settle(capacity in 1usize..5, tasks in 1usize..24) {
            let (peak, settled, stats) = tokio_test::block_on(async move {
                let queue = ConcurrencyQueue::new(capacity);
                let gauge = Arc::new(Gauge::default());

                let handles: Vec<_> = (0..tasks)
                    .map(|i| {
                        let gauge = gauge.clone();
                        queue.add(move || async move {
                            gauge.enter();
                            for _ in 0..(i % 3 + 1) {
                                tokio::task::yield_now().await;
                            }
                            gauge.exit();
                            if i % 4 == 0 {
                                Err(DashboardError::Parse("odd".into()))
                            } else {
                                Ok(i)
                            }
                        })
                    })
                    .collect();

                let settled = futures_util::future::join_all(handles).await.len();
                (gauge.peak.load(Ordering::SeqCst), settled, queue.stats())
            });

            prop_assert!(peak <= capacity);
            prop_assert_eq!(settled, tasks);
            prop_assert_eq!(stats.completed as usize, tasks);
            prop_assert_eq!(stats.failed as usize, (0..tasks).filter(|i| i % 4 == 0).count());
            prop_assert!(stats.is_idle());
        }
    }
}

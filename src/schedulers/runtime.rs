//! # Scheduler over a tokio runtime.
//!
//! [`TokioScheduler`] backs both built-in pools and can wrap any runtime handle:
//!
//! - `DrainMode::Inline`: tasks run on the runtime's async worker threads (computation).
//! - `DrainMode::Blocking`: tasks run on the runtime's blocking pool (io).
//!
//! Each [`Worker`] is one [`TaskQueue`] plus one spawned drain loop, so a worker's tasks
//! never overlap and run in due-time order. Workers share nothing with each other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;

use super::queue::{DrainMode, TaskQueue, drain, run};
use super::{Runnable, ScheduledTask, Scheduler, Worker, WorkerRef};
use crate::disposables::{Disposable, DisposableRef, disposed};
use crate::error::RxError;
use crate::plugins::Plugins;

/// A runtime owned by a scheduler. Shut down in the background on drop, which is legal
/// from inside an async context.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(rt) = self.0.take() {
            rt.shutdown_background();
        }
    }
}

/// A [`Scheduler`] that runs tasks on a tokio runtime.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use rxvisor::{Scheduler, TokioScheduler};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scheduler = TokioScheduler::from_current().unwrap();
/// let (tx, rx) = tokio::sync::oneshot::channel();
/// scheduler.schedule_direct(Box::new(move || { let _ = tx.send(42); }), Duration::ZERO);
/// assert_eq!(rx.await.unwrap(), 42);
/// # }
/// ```
pub struct TokioScheduler {
    handle: Handle,
    mode: DrainMode,
    _runtime: Option<OwnedRuntime>,
}

impl TokioScheduler {
    /// Runs tasks on the async worker threads of `handle`'s runtime.
    pub fn new(handle: Handle) -> Arc<Self> {
        Arc::new(Self {
            handle,
            mode: DrainMode::Inline,
            _runtime: None,
        })
    }

    /// Runs tasks on the blocking pool of `handle`'s runtime.
    pub fn blocking(handle: Handle) -> Arc<Self> {
        Arc::new(Self {
            handle,
            mode: DrainMode::Blocking,
            _runtime: None,
        })
    }

    /// Wraps the runtime the caller is currently running on.
    pub fn from_current() -> Result<Arc<Self>, RxError> {
        let handle = Handle::try_current()
            .map_err(|e| RxError::illegal_state(format!("no tokio runtime available: {e}")))?;
        Ok(Self::new(handle))
    }

    /// Takes ownership of `runtime`; it is shut down when the scheduler is dropped.
    pub(crate) fn owning(runtime: Runtime, mode: DrainMode) -> Arc<Self> {
        Arc::new(Self {
            handle: runtime.handle().clone(),
            mode,
            _runtime: Some(OwnedRuntime(Some(runtime))),
        })
    }

    /// The runtime handle tasks are spawned on.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// How this scheduler executes its tasks.
    pub fn mode(&self) -> DrainMode {
        self.mode
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        now()
    }

    fn create_worker(&self) -> WorkerRef {
        TokioWorker::start(&self.handle, self.mode)
    }

    fn schedule_direct(&self, task: Runnable, delay: Duration) -> DisposableRef {
        let task = ScheduledTask::new(Plugins::global().on_schedule(task), CancellationToken::new());
        let pending = Arc::clone(&task);
        let token = task.token().clone();
        let mode = self.mode;
        self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            run(pending, mode).await;
        });
        task
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("mode", &self.mode)
            .field("owns_runtime", &self._runtime.is_some())
            .finish()
    }
}

/// Virtual-time aware clock: follows tokio's paused clock inside a runtime.
pub(crate) fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// One sequential lane on a tokio runtime.
pub struct TokioWorker {
    token: CancellationToken,
    queue: TaskQueue,
}

impl TokioWorker {
    fn start(handle: &Handle, mode: DrainMode) -> WorkerRef {
        let (queue, rx) = TaskQueue::new();
        let token = CancellationToken::new();
        handle.spawn(drain(rx, token.clone(), mode));
        Arc::new(Self { token, queue })
    }
}

impl Worker for TokioWorker {
    fn schedule(&self, task: Runnable, delay: Duration) -> DisposableRef {
        if self.token.is_cancelled() {
            return disposed();
        }
        let task = ScheduledTask::new(
            Plugins::global().on_schedule(task),
            self.token.child_token(),
        );
        if !self.queue.push(Arc::clone(&task), delay) || self.token.is_cancelled() {
            task.dispose();
            return disposed();
        }
        task
    }

    fn dispose(&self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            self.queue.close();
            tracing::trace!("tokio worker disposed");
        }
    }

    fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }

    fn now(&self) -> Instant {
        now()
    }
}

impl Drop for TokioWorker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedulers::WorkerExt;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn worker_runs_in_order_and_dispose_cancels_pending() {
        let scheduler = TokioScheduler::from_current().unwrap();
        let worker = scheduler.create_worker();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (v, ms) in [(1, 10u64), (2, 10), (3, 500)] {
            let log = Arc::clone(&log);
            worker.schedule(Box::new(move || log.lock().push(v)), Duration::from_millis(ms));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*log.lock(), vec![1, 2]);

        worker.dispose();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(*log.lock(), vec![1, 2]);
        assert!(worker.schedule(Box::new(|| {}), Duration::ZERO).is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn direct_task_can_be_cancelled() {
        let scheduler = TokioScheduler::from_current().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let d = scheduler.schedule_direct(
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(50),
        );
        d.dispose();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_is_fixed_rate() {
        let scheduler = TokioScheduler::from_current().unwrap();
        let worker = scheduler.create_worker();
        let start = scheduler.now();
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&stamps);
        let clock = Arc::clone(&scheduler);
        let d = worker.schedule_periodic(
            Arc::new(move || s.lock().push(clock.now())),
            Duration::from_millis(10),
            Duration::from_millis(100),
        );
        tokio::time::sleep(Duration::from_millis(350)).await;
        d.dispose();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let offsets: Vec<u128> = stamps
            .lock()
            .iter()
            .map(|t| t.duration_since(start).as_millis())
            .collect();
        assert_eq!(offsets, vec![10, 110, 210, 310]);
    }

    #[tokio::test]
    async fn blocking_mode_runs_every_task() {
        let scheduler = TokioScheduler::blocking(Handle::current());
        assert_eq!(scheduler.mode(), DrainMode::Blocking);
        let worker = scheduler.create_worker();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        for v in 0..3 {
            let log = Arc::clone(&log);
            worker.schedule(Box::new(move || log.lock().push(v)), Duration::ZERO);
        }
        worker.schedule(
            Box::new(move || {
                let _ = tx.send(());
            }),
            Duration::ZERO,
        );
        rx.await.unwrap();
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }
}

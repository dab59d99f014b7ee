//! The `Scheduler` / `Worker` contracts and fixed-rate periodic scheduling on top of them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::disposables::{Disposable, DisposableCell, DisposableRef};

/// A unit of work handed to a scheduler.
pub type Runnable = Box<dyn FnOnce() + Send + 'static>;

/// A repeatable unit of work for periodic scheduling.
pub type PeriodicTask = Arc<dyn Fn() + Send + Sync + 'static>;

/// Shared handle to a scheduler.
pub type SchedulerRef = Arc<dyn Scheduler>;

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// An execution context that runs tasks now or later.
///
/// Work scheduled directly on a scheduler has no ordering guarantee; work that must run in
/// order goes through one [`Worker`] from [`create_worker`](Scheduler::create_worker).
pub trait Scheduler: Send + Sync + 'static {
    /// Current time as seen by this scheduler.
    fn now(&self) -> Instant;

    /// Creates a worker: a sequential lane of execution with batch cancellation.
    fn create_worker(&self) -> WorkerRef;

    /// Runs `task` once after `delay`. The returned token cancels it if it did not start yet.
    fn schedule_direct(&self, task: Runnable, delay: Duration) -> DisposableRef {
        let worker = self.create_worker();
        let owner = Arc::clone(&worker);
        worker.schedule(
            Box::new(move || {
                task();
                owner.dispose();
            }),
            delay,
        );
        Arc::new(WorkerDisposable(worker))
    }

    /// Runs `task` after `initial`, then repeatedly every `period` at a fixed rate.
    fn schedule_periodic_direct(
        &self,
        task: PeriodicTask,
        initial: Duration,
        period: Duration,
    ) -> DisposableRef {
        let worker = self.create_worker();
        worker.schedule_periodic(task, initial, period);
        Arc::new(WorkerDisposable(worker))
    }
}

/// A sequential lane of execution.
///
/// ## Rules
/// - Tasks run one at a time, ordered by due time, then by submission order.
/// - [`dispose`](Worker::dispose) cancels every task that did not start yet; `schedule`
///   racing with it returns an already-disposed token.
pub trait Worker: Send + Sync + 'static {
    /// Runs `task` after `delay` on this worker.
    fn schedule(&self, task: Runnable, delay: Duration) -> DisposableRef;

    /// Cancels all pending work and rejects future work.
    fn dispose(&self);

    /// Whether the worker was disposed.
    fn is_disposed(&self) -> bool;

    /// Current time as seen by this worker.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Fixed-rate periodic scheduling for shared workers.
pub trait WorkerExt {
    /// Runs `task` after `initial` and then every `period`; deadlines are
    /// `start + initial + n * period`, so a slow tick does not shift the next ones.
    ///
    /// A disposed check runs immediately before every tick.
    fn schedule_periodic(
        &self,
        task: PeriodicTask,
        initial: Duration,
        period: Duration,
    ) -> DisposableRef;
}

impl WorkerExt for WorkerRef {
    fn schedule_periodic(
        &self,
        task: PeriodicTask,
        initial: Duration,
        period: Duration,
    ) -> DisposableRef {
        let cell = Arc::new(DisposableCell::new());
        let periodic = Arc::new(Periodic {
            worker: Arc::clone(self),
            task,
            first: self.now() + initial,
            period,
            ticks: AtomicU32::new(0),
            cell: Arc::clone(&cell),
        });
        let next = Arc::clone(&periodic);
        cell.replace(self.schedule(Box::new(move || next.tick()), initial));
        cell
    }
}

struct Periodic {
    worker: WorkerRef,
    task: PeriodicTask,
    first: Instant,
    period: Duration,
    ticks: AtomicU32,
    cell: Arc<DisposableCell>,
}

impl Periodic {
    fn tick(self: Arc<Self>) {
        if self.cell.is_disposed() || self.worker.is_disposed() {
            return;
        }
        (self.task)();
        if self.cell.is_disposed() {
            return;
        }
        let n = self.ticks.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let deadline = self.first + self.period.saturating_mul(n);
        let delay = deadline.saturating_duration_since(self.worker.now());
        let next = Arc::clone(&self);
        self.cell
            .replace(self.worker.schedule(Box::new(move || next.tick()), delay));
    }
}

/// Disposes a worker when disposed; used by direct scheduling helpers.
pub(crate) struct WorkerDisposable(pub(crate) WorkerRef);

impl Disposable for WorkerDisposable {
    fn dispose(&self) {
        self.0.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.0.is_disposed()
    }
}

//! # Built-in schedulers.
//!
//! ```text
//! Schedulers::computation() ──► init hook (first use) ──► on_computation hook ──► scheduler
//! Schedulers::io()          ──► init hook (first use) ──► on_io hook          ──► scheduler
//! ```
//!
//! - computation: multi-thread runtime, one worker thread per core (see [`Config`]).
//! - io: blocking pool that grows on demand up to `io_max_threads`.
//!
//! Both runtimes are created lazily and live for the rest of the process.

use std::sync::{Arc, OnceLock};

use super::queue::DrainMode;
use super::{HostScheduler, Looper, SchedulerRef, TokioScheduler};
use crate::config::Config;
use crate::error::RxError;
use crate::plugins::Plugins;

static COMPUTATION: OnceLock<SchedulerRef> = OnceLock::new();
static IO: OnceLock<SchedulerRef> = OnceLock::new();

/// Entry points to the built-in schedulers.
pub struct Schedulers;

impl Schedulers {
    /// The shared computation scheduler.
    ///
    /// # Panics
    /// If the runtime cannot be created on first use (the process cannot spawn threads).
    pub fn computation() -> SchedulerRef {
        let plugins = Plugins::global();
        let base = COMPUTATION.get_or_init(|| {
            plugins.init_computation(&|| fatal(Self::computation_with(Config::global())))
        });
        plugins.on_computation(Arc::clone(base))
    }

    /// The shared io scheduler.
    ///
    /// # Panics
    /// If the runtime cannot be created on first use.
    pub fn io() -> SchedulerRef {
        let plugins = Plugins::global();
        let base = IO.get_or_init(|| plugins.init_io(&|| fatal(Self::io_with(Config::global()))));
        plugins.on_io(Arc::clone(base))
    }

    /// Builds a dedicated computation scheduler from `cfg`.
    pub fn computation_with(cfg: &Config) -> Result<SchedulerRef, RxError> {
        let threads = cfg.computation_threads_effective();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("rxvisor-computation")
            .enable_time()
            .build()
            .map_err(|e| RxError::illegal_state(format!("computation runtime: {e}")))?;
        tracing::debug!(threads, "computation scheduler started");
        Ok(TokioScheduler::owning(runtime, DrainMode::Inline))
    }

    /// Builds a dedicated io scheduler from `cfg`.
    pub fn io_with(cfg: &Config) -> Result<SchedulerRef, RxError> {
        let max_threads = cfg.io_max_threads_clamped();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_threads)
            .thread_keep_alive(cfg.io_keep_alive)
            .thread_name("rxvisor-io")
            .enable_time()
            .build()
            .map_err(|e| RxError::illegal_state(format!("io runtime: {e}")))?;
        tracing::debug!(max_threads, "io scheduler started");
        Ok(TokioScheduler::owning(runtime, DrainMode::Blocking))
    }

    /// A scheduler running on the async workers of an existing runtime.
    pub fn from_handle(handle: tokio::runtime::Handle) -> SchedulerRef {
        TokioScheduler::new(handle)
    }

    /// A scheduler on the runtime the caller is running on.
    pub fn current() -> Result<SchedulerRef, RxError> {
        let scheduler: SchedulerRef = TokioScheduler::from_current()?;
        Ok(scheduler)
    }

    /// A scheduler posting to a host dispatcher.
    pub fn host(looper: Arc<dyn Looper>) -> SchedulerRef {
        HostScheduler::new(looper)
    }
}

fn fatal(result: Result<SchedulerRef, RxError>) -> SchedulerRef {
    match result {
        Ok(scheduler) => scheduler,
        Err(err) => {
            tracing::error!(label = err.as_label(), error = %err, "built-in scheduler unavailable");
            panic!("rxvisor: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedulers::{Scheduler, Worker};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn computation_is_shared_and_runs_tasks() {
        let a = Schedulers::computation();
        let b = Schedulers::computation();
        assert!(Arc::ptr_eq(&a, &b));

        let (tx, rx) = mpsc::channel();
        a.schedule_direct(
            Box::new(move || {
                let _ = tx.send(std::thread::current().name().map(str::to_owned));
            }),
            Duration::ZERO,
        );
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("rxvisor-computation"));
    }

    #[test]
    fn io_runs_on_its_own_pool() {
        let io = Schedulers::io();
        let worker = io.create_worker();
        let (tx, rx) = mpsc::channel();
        worker.schedule(
            Box::new(move || {
                let _ = tx.send(std::thread::current().name().map(str::to_owned));
            }),
            Duration::ZERO,
        );
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("rxvisor-io"));
        worker.dispose();
    }

    #[test]
    fn current_requires_a_runtime() {
        assert!(Schedulers::current().is_err());
    }
}

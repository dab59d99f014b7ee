//! # Execution contexts.
//!
//! A [`Scheduler`] runs tasks now or after a delay and hands out [`Worker`]s: sequential
//! lanes whose pending work is cancelled as one batch on dispose.
//!
//! ## Flavors
//! ```text
//! Schedulers::computation()  ──► TokioScheduler (multi-thread runtime, Inline drain)
//! Schedulers::io()           ──► TokioScheduler (blocking pool, Blocking drain)
//! Schedulers::from_handle(h) ──► TokioScheduler over any runtime
//! Schedulers::host(looper)   ──► HostScheduler ──► Looper (e.g. LoopThread)
//! ```
//!
//! ## Rules
//! - A worker's tasks run one at a time, by due time, then by submission order.
//! - Periodic work is fixed-rate and checks for disposal right before every tick.
//! - A panicking task is reported as `RxError::SchedulerFatal` and then re-raised.

mod facade;
mod host;
mod looper;
mod queue;
mod runtime;
mod scheduler;
mod task;

pub use facade::Schedulers;
pub use host::{HostScheduler, Looper, PostId};
pub use looper::LoopThread;
pub use queue::DrainMode;
pub use runtime::{TokioScheduler, TokioWorker};
pub use scheduler::{
    PeriodicTask, Runnable, Scheduler, SchedulerRef, Worker, WorkerExt, WorkerRef,
};
pub(crate) use task::ScheduledTask;


//! # rxvisor
//!
//! **rxvisor** is a push-based reactive streams engine for Rust.
//!
//! It provides observables with fluent operators, observers, cancellable disposables,
//! schedulers backed by tokio (or any single-threaded host dispatcher) and a process-wide
//! plugin hub for cross-cutting hooks.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   assembly time (no execution)                         run time
//!   ────────────────────────────                         ────────
//!   Observable::create(..)                               subscribe(observer)
//!       .map(..)            ── Plugins::on_assembly        │
//!       .debounce(..)       ── Plugins::on_assembly        ├─► Plugins::on_subscribe
//!       .observe_on(..)     ── Plugins::on_assembly        └─► subscribe_actual, outermost first
//!
//!   ┌──────────┐   on_next    ┌─────────┐   on_next    ┌──────────┐   on_next    ┌──────────┐
//!   │ producer │ ───────────► │   map   │ ───────────► │ debounce │ ───────────► │ observer │
//!   └──────────┘              └─────────┘              └────┬─────┘  (worker)    └──────────┘
//!        ▲                                                  │ timers
//!        │            dispose (upstream direction)          ▼
//!        └────────────────────────────────────────── Worker (Scheduler)
//!
//!   undeliverable errors / late errors / scheduler panics ──► Plugins::on_error
//! ```
//!
//! ### Observer protocol
//! ```text
//! on_subscribe(d)  exactly once, first
//! on_next(v)*      zero or more
//! on_error(e) | on_complete()   at most one, last
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types / traits                                |
//! |-----------------|--------------------------------------------------------------|---------------------------------------------------|
//! | **Observables** | Factories and fluent operators, subscribe handshake.         | [`Observable`], [`ObservableSource`], [`Emitter`] |
//! | **Observers**   | Consumer contract, callback builder, serializing adapter.    | [`Observer`], [`SubscriberBuilder`], [`SerializedObserver`] |
//! | **Disposables** | One-way cancellation tokens and containers.                  | [`Disposable`], [`DisposableCell`], [`CompositeDisposable`] |
//! | **Schedulers**  | Computation, io, tokio-handle and host-thread schedulers.    | [`Scheduler`], [`Worker`], [`Schedulers`]         |
//! | **Plugins**     | Error, schedule, scheduler, assembly and subscribe hooks.    | [`Plugins`]                                       |
//! | **Subjects**    | Multicast observer/observable.                               | [`Subject`], [`PublishSubject`]                   |
//! | **Errors**      | Typed errors with a bug/undeliverable split.                 | [`RxError`], [`CompositeError`]                   |
//! | **Configuration** | Buffer size and scheduler sizing from the environment.     | [`Config`]                                        |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogObserver`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use rxvisor::{Observable, Schedulers};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), rxvisor::RxError> {
//!     let scheduler = Schedulers::current()?;
//!
//!     let handle = Observable::interval(Duration::ZERO, Duration::from_millis(10), scheduler.clone())
//!         .map(|n| n * 2)
//!         .filter(|n| n % 4 == 0)
//!         .throttle_first(Duration::from_millis(25), scheduler)
//!         .subscriber()
//!         .on_next(|n| println!("tick {n}"))
//!         .on_error(|e| eprintln!("failed: {e}"))
//!         .subscribe()?;
//!
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     handle.dispose();
//!     Ok(())
//! }
//! # use rxvisor::Disposable;
//! ```
mod config;
mod disposables;
mod error;
pub mod functions;
mod notification;
mod observable;
mod observers;
mod plugins;
mod schedulers;
mod subjects;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use config::Config;
pub use disposables::{
    ActionDisposable, BooleanDisposable, CompositeDisposable, Disposable, DisposableCell,
    DisposableRef, disposed, empty, from_fn,
};
pub use error::{CompositeError, ErrorKind, RxError};
pub use notification::{AppendOnlyList, Notification};
pub use observable::{Emitter, Observable, ObservableSource, RxStream};
pub use observers::{BoxObserver, LambdaObserver, Observer, SerializedObserver, SubscriberBuilder};
pub use plugins::{
    AnyObserver, Assembly, AssemblyHook, ErrorHandler, InitSchedulerHook, Plugins, ScheduleHook,
    SchedulerHook, SubscribeHook, SubscribeInfo,
};
pub use schedulers::{
    DrainMode, HostScheduler, LoopThread, Looper, PeriodicTask, PostId, Runnable, Scheduler,
    SchedulerRef, Schedulers, TokioScheduler, TokioWorker, Worker, WorkerExt, WorkerRef,
};
pub use subjects::{PublishSubject, Subject};

// Optional: expose a simple built-in logging observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogObserver;

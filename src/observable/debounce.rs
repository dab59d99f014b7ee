//! # `debounce`: emit an item only after a quiet period.
//!
//! ```text
//! on_next(v) ─► index += 1 ─► cancel pending emitter ─► schedule Emitter{v, index} @ timeout
//!
//! emitter fires ─► lock gate ─► once? ─► index still current? ─► downstream.next(v)
//! on_complete   ─► take pending emitter ─► run it now (same gate) ─► downstream.complete()
//! on_error      ─► cancel pending emitter ─► downstream.error(e)
//! ```
//!
//! ## Rules
//! - Each emitter emits at most once (its `once` flag flips inside the gate).
//! - The gate orders a timer emission against the completion flush, so completion is never
//!   delivered ahead of the last pending item.
//! - A late `on_error` goes to the plugin hub; a late `on_complete` is dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::disposables::{Disposable, DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer, SerializedObserver};
use crate::plugins::Plugins;
use crate::schedulers::{SchedulerRef, WorkerRef};

struct Debounce<T> {
    source: Observable<T>,
    timeout: Duration,
    scheduler: SchedulerRef,
}

impl<T: Send + 'static> ObservableSource<T> for Debounce<T> {
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        let state = Arc::new(State {
            downstream: SerializedObserver::new(observer, false),
            upstream: DisposableCell::new(),
            worker: self.scheduler.create_worker(),
            pending: Mutex::new(None),
            index: AtomicU64::new(0),
            done: AtomicBool::new(false),
            gate: Mutex::new(()),
        });
        self.source.subscribe(Box::new(DebounceObserver {
            state,
            timeout: self.timeout,
        }))
    }

    fn name(&self) -> &'static str {
        "debounce"
    }
}

struct State<T> {
    downstream: SerializedObserver<T>,
    upstream: DisposableCell,
    worker: WorkerRef,
    pending: Mutex<Option<Arc<Emitter<T>>>>,
    index: AtomicU64,
    done: AtomicBool,
    gate: Mutex<()>,
}

impl<T: Send + 'static> State<T> {
    fn cancel_pending(&self) {
        if let Some(emitter) = self.pending.lock().take() {
            emitter.timer.dispose();
        }
    }
}

impl<T: Send + 'static> Disposable for State<T> {
    fn dispose(&self) {
        self.upstream.dispose();
        self.worker.dispose();
        self.cancel_pending();
    }

    fn is_disposed(&self) -> bool {
        self.upstream.is_disposed()
    }
}

/// One pending emission, tagged with the index it was scheduled for.
struct Emitter<T> {
    value: Mutex<Option<T>>,
    index: u64,
    once: AtomicBool,
    timer: DisposableCell,
    parent: Weak<State<T>>,
}

impl<T: Send + 'static> Emitter<T> {
    fn run(&self) {
        let Some(parent) = self.parent.upgrade() else {
            return;
        };
        let _gate = parent.gate.lock();
        if self.once.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.index == parent.index.load(Ordering::Acquire) {
            if let Some(value) = self.value.lock().take() {
                parent.downstream.next(value);
            }
        }
    }
}

struct DebounceObserver<T> {
    state: Arc<State<T>>,
    timeout: Duration,
}

impl<T: Send + 'static> Observer<T> for DebounceObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        if self.state.upstream.set_once(d) {
            self.state.downstream.subscribe(self.state.clone());
        }
    }

    fn on_next(&mut self, value: T) {
        if self.state.done.load(Ordering::Acquire) {
            return;
        }
        let index = self.state.index.fetch_add(1, Ordering::AcqRel) + 1;
        let emitter = Arc::new(Emitter {
            value: Mutex::new(Some(value)),
            index,
            once: AtomicBool::new(false),
            timer: DisposableCell::new(),
            parent: Arc::downgrade(&self.state),
        });
        if let Some(previous) = self.state.pending.lock().replace(Arc::clone(&emitter)) {
            previous.timer.dispose();
        }
        let fire = Arc::clone(&emitter);
        let timer = self
            .state
            .worker
            .schedule(Box::new(move || fire.run()), self.timeout);
        emitter.timer.set(timer);
    }

    fn on_error(&mut self, error: RxError) {
        if self.state.done.swap(true, Ordering::AcqRel) {
            Plugins::global().on_error(error);
            return;
        }
        self.state.cancel_pending();
        self.state.downstream.error(error);
        self.state.worker.dispose();
    }

    fn on_complete(&mut self) {
        if self.state.done.swap(true, Ordering::AcqRel) {
            return;
        }
        let pending = self.state.pending.lock().take();
        if let Some(emitter) = pending {
            emitter.timer.dispose();
            emitter.run();
        }
        self.state.downstream.complete();
        self.state.worker.dispose();
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Emits an item only once `timeout` passed without a newer one; the last pending item
    /// is flushed on completion.
    pub fn debounce(&self, timeout: Duration, scheduler: SchedulerRef) -> Self {
        Self::assemble(Debounce {
            source: self.clone(),
            timeout,
            scheduler,
        })
    }
}

//! # `observe_on`: move signal delivery onto a scheduler worker.
//!
//! ```text
//! upstream thread                 worker lane
//! ───────────────                 ───────────
//! on_next(v) ─► queue.push(v) ─┐
//!                              ├─► wip 0→1 ? schedule(drain)
//! on_complete ─► done = true ──┘          │
//!                                         ▼
//!                                 drain: pop → downstream.on_next
//!                                        ... until queue empty and wip settles
//! ```
//!
//! ## Rules
//! - Exactly one drain runs at a time (`wip` missed-counter); all downstream signals come
//!   from it, in upstream order.
//! - Without `delay_error` a pending error jumps ahead of queued items; with it, queued
//!   items are delivered first.
//! - Dispose cancels the upstream, disposes the worker and drops queued items.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::disposables::{Disposable, DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::functions::verify_positive;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer};
use crate::plugins::Plugins;
use crate::schedulers::{SchedulerRef, WorkerRef};

struct ObserveOn<T> {
    source: Observable<T>,
    scheduler: SchedulerRef,
    delay_error: bool,
    buffer_size: usize,
}

impl<T: Send + 'static> ObservableSource<T> for ObserveOn<T> {
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        let state = Arc::new(State {
            downstream: Mutex::new(observer),
            queue: Mutex::new(VecDeque::with_capacity(self.buffer_size)),
            error: Mutex::new(None),
            done: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            wip: AtomicUsize::new(0),
            upstream: DisposableCell::new(),
            worker: self.scheduler.create_worker(),
            delay_error: self.delay_error,
        });
        self.source.subscribe(Box::new(ObserveOnObserver { state }))
    }

    fn name(&self) -> &'static str {
        "observe_on"
    }
}

struct State<T> {
    downstream: Mutex<BoxObserver<T>>,
    queue: Mutex<VecDeque<T>>,
    error: Mutex<Option<RxError>>,
    done: AtomicBool,
    disposed: AtomicBool,
    wip: AtomicUsize,
    upstream: DisposableCell,
    worker: WorkerRef,
    delay_error: bool,
}

impl<T: Send + 'static> State<T> {
    fn schedule(self: &Arc<Self>) {
        if self.wip.fetch_add(1, Ordering::AcqRel) == 0 {
            let state = Arc::clone(self);
            self.worker.schedule(Box::new(move || state.drain()), Duration::ZERO);
        }
    }

    fn drain(&self) {
        let mut missed = 1;
        let mut downstream = self.downstream.lock();
        loop {
            let done = self.done.load(Ordering::Acquire);
            let empty = self.queue.lock().is_empty();
            if self.check_terminated(done, empty, &mut downstream) {
                return;
            }
            loop {
                let done = self.done.load(Ordering::Acquire);
                let item = self.queue.lock().pop_front();
                if self.check_terminated(done, item.is_none(), &mut downstream) {
                    return;
                }
                match item {
                    Some(value) => downstream.on_next(value),
                    None => break,
                }
            }
            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                break;
            }
        }
    }

    fn check_terminated(
        &self,
        done: bool,
        empty: bool,
        downstream: &mut BoxObserver<T>,
    ) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            self.queue.lock().clear();
            return true;
        }
        if !done {
            return false;
        }
        let error = if self.delay_error {
            if !empty {
                return false;
            }
            self.error.lock().take()
        } else {
            match self.error.lock().take() {
                Some(error) => {
                    self.queue.lock().clear();
                    Some(error)
                }
                None if empty => None,
                None => return false,
            }
        };
        self.disposed.store(true, Ordering::Release);
        match error {
            Some(error) => downstream.on_error(error),
            None => downstream.on_complete(),
        }
        self.worker.dispose();
        true
    }
}

impl<T: Send + 'static> Disposable for State<T> {
    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.upstream.dispose();
            self.worker.dispose();
            if self.wip.fetch_add(1, Ordering::AcqRel) == 0 {
                self.queue.lock().clear();
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

struct ObserveOnObserver<T> {
    state: Arc<State<T>>,
}

impl<T: Send + 'static> Observer<T> for ObserveOnObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        if self.state.upstream.set_once(d) {
            let handle: DisposableRef = self.state.clone();
            self.state.downstream.lock().on_subscribe(handle);
        }
    }

    fn on_next(&mut self, value: T) {
        if self.state.done.load(Ordering::Acquire) {
            return;
        }
        self.state.queue.lock().push_back(value);
        self.state.schedule();
    }

    fn on_error(&mut self, error: RxError) {
        if self.state.done.load(Ordering::Acquire) {
            Plugins::global().on_error(error);
            return;
        }
        *self.state.error.lock() = Some(error);
        self.state.done.store(true, Ordering::Release);
        self.state.schedule();
    }

    fn on_complete(&mut self) {
        if self.state.done.load(Ordering::Acquire) {
            return;
        }
        self.state.done.store(true, Ordering::Release);
        self.state.schedule();
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Delivers signals on a worker of `scheduler`, with the configured buffer size and
    /// errors cutting ahead of queued items.
    pub fn observe_on(&self, scheduler: SchedulerRef) -> Self {
        Self::assemble(ObserveOn {
            source: self.clone(),
            scheduler,
            delay_error: false,
            buffer_size: crate::config::buffer_size(),
        })
    }

    /// Like [`observe_on`](Observable::observe_on) with explicit settings.
    ///
    /// # Errors
    /// [`RxError::IllegalArgument`] if `buffer_size` is zero.
    pub fn observe_on_with(
        &self,
        scheduler: SchedulerRef,
        delay_error: bool,
        buffer_size: usize,
    ) -> Result<Self, RxError> {
        let buffer_size = verify_positive(buffer_size, "bufferSize")?;
        Ok(Self::assemble(ObserveOn {
            source: self.clone(),
            scheduler,
            delay_error,
            buffer_size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::observable::Emitter;
    use crate::schedulers::Schedulers;
    use crate::test_support::Recorder;

    #[tokio::test]
    async fn zero_buffer_is_rejected() {
        let err = Observable::just(1)
            .observe_on_with(Schedulers::current().unwrap(), false, 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArgument);
        assert!(err.to_string().contains("bufferSize > 0 required but it was 0"));
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_in_order_on_the_worker() {
        let rec = Recorder::new();
        Observable::from_iter(0..100)
            .observe_on(Schedulers::current().unwrap())
            .subscribe(rec.boxed())
            .unwrap();
        assert!(rec.values().is_empty());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(rec.values(), (0..100).collect::<Vec<_>>());
        rec.assert_protocol();
        assert!(rec.is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn error_cuts_ahead_unless_delayed() {
        let source = Observable::create(|e: Emitter<u8>| {
            e.on_next(1);
            e.on_next(2);
            e.on_error(RxError::illegal_state("upstream broke"));
            Ok(())
        });

        let eager = Recorder::new();
        source
            .observe_on(Schedulers::current().unwrap())
            .subscribe(eager.boxed())
            .unwrap();
        let delayed = Recorder::new();
        source
            .observe_on_with(Schedulers::current().unwrap(), true, 16)
            .unwrap()
            .subscribe(delayed.boxed())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(eager.values().is_empty());
        assert_eq!(eager.terminal_count(), 1);
        assert_eq!(delayed.values(), vec![1, 2]);
        assert_eq!(delayed.error().map(|e| e.kind()), Some(ErrorKind::IllegalState));
        delayed.assert_protocol();
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_drops_queued_items() {
        let rec = Recorder::<u32>::new();
        Observable::from_iter(0..10u32)
            .observe_on(Schedulers::current().unwrap())
            .subscribe(rec.boxed())
            .unwrap();
        rec.dispose();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(rec.values().is_empty());
        assert_eq!(rec.terminal_count(), 0);
    }
}

//! `delay`: shift every signal forward in time on a worker.

use std::sync::Arc;
use std::time::Duration;

use crate::disposables::{Disposable, DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer, SerializedObserver};
use crate::schedulers::{SchedulerRef, WorkerRef};

struct Delay<T> {
    source: Observable<T>,
    delay: Duration,
    scheduler: SchedulerRef,
    delay_error: bool,
}

impl<T: Send + 'static> ObservableSource<T> for Delay<T> {
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        let state = Arc::new(State {
            downstream: SerializedObserver::new(observer, self.delay_error),
            upstream: DisposableCell::new(),
            worker: self.scheduler.create_worker(),
        });
        self.source.subscribe(Box::new(DelayObserver {
            state,
            delay: self.delay,
            delay_error: self.delay_error,
        }))
    }

    fn name(&self) -> &'static str {
        "delay"
    }
}

struct State<T> {
    downstream: SerializedObserver<T>,
    upstream: DisposableCell,
    worker: WorkerRef,
}

impl<T: Send + 'static> Disposable for State<T> {
    fn dispose(&self) {
        self.upstream.dispose();
        self.worker.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.worker.is_disposed()
    }
}

struct DelayObserver<T> {
    state: Arc<State<T>>,
    delay: Duration,
    delay_error: bool,
}

impl<T: Send + 'static> Observer<T> for DelayObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        if self.state.upstream.set_once(d) {
            self.state.downstream.subscribe(self.state.clone());
        }
    }

    fn on_next(&mut self, value: T) {
        let downstream = self.state.downstream.clone();
        self.state
            .worker
            .schedule(Box::new(move || downstream.next(value)), self.delay);
    }

    fn on_error(&mut self, error: RxError) {
        let state = Arc::clone(&self.state);
        let delay = if self.delay_error {
            self.delay
        } else {
            Duration::ZERO
        };
        self.state.worker.schedule(
            Box::new(move || {
                state.downstream.error(error);
                state.worker.dispose();
            }),
            delay,
        );
    }

    fn on_complete(&mut self) {
        let state = Arc::clone(&self.state);
        self.state.worker.schedule(
            Box::new(move || {
                state.downstream.complete();
                state.worker.dispose();
            }),
            self.delay,
        );
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Delays every signal by `delay` on a worker of `scheduler`.
    ///
    /// With `delay_error` false an error is delivered right away, dropping items that are
    /// still waiting.
    pub fn delay(&self, delay: Duration, scheduler: SchedulerRef, delay_error: bool) -> Self {
        Self::assemble(Delay {
            source: self.clone(),
            delay,
            scheduler,
            delay_error,
        })
    }
}

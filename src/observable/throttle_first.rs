//! `throttle_first`: pass the first item of every window, drop the rest.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::disposables::{Disposable, DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer, SerializedObserver};
use crate::plugins::Plugins;
use crate::schedulers::{SchedulerRef, WorkerRef};

struct ThrottleFirst<T> {
    source: Observable<T>,
    window: Duration,
    scheduler: SchedulerRef,
}

impl<T: Send + 'static> ObservableSource<T> for ThrottleFirst<T> {
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        let state = Arc::new(State {
            downstream: SerializedObserver::new(observer, false),
            upstream: DisposableCell::new(),
            timer: DisposableCell::new(),
            worker: self.scheduler.create_worker(),
            gate: AtomicBool::new(false),
            done: AtomicBool::new(false),
        });
        self.source.subscribe(Box::new(ThrottleObserver {
            state,
            window: self.window,
        }))
    }

    fn name(&self) -> &'static str {
        "throttle_first"
    }
}

struct State<T> {
    downstream: SerializedObserver<T>,
    upstream: DisposableCell,
    timer: DisposableCell,
    worker: WorkerRef,
    /// Closed while a window is in flight.
    gate: AtomicBool,
    done: AtomicBool,
}

impl<T: Send + 'static> Disposable for State<T> {
    fn dispose(&self) {
        self.upstream.dispose();
        self.timer.dispose();
        self.worker.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.upstream.is_disposed()
    }
}

struct ThrottleObserver<T> {
    state: Arc<State<T>>,
    window: Duration,
}

impl<T: Send + 'static> Observer<T> for ThrottleObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        if self.state.upstream.set_once(d) {
            self.state.downstream.subscribe(self.state.clone());
        }
    }

    fn on_next(&mut self, value: T) {
        if self.state.done.load(Ordering::Acquire) || self.state.gate.load(Ordering::Acquire) {
            return;
        }
        self.state.gate.store(true, Ordering::Release);
        self.state.downstream.next(value);

        let state = Arc::downgrade(&self.state);
        let reopen = self.state.worker.schedule(
            Box::new(move || {
                if let Some(state) = state.upgrade() {
                    state.gate.store(false, Ordering::Release);
                }
            }),
            self.window,
        );
        self.state.timer.set(reopen);
    }

    fn on_error(&mut self, error: RxError) {
        if self.state.done.swap(true, Ordering::AcqRel) {
            Plugins::global().on_error(error);
            return;
        }
        self.state.downstream.error(error);
        self.state.worker.dispose();
    }

    fn on_complete(&mut self) {
        if self.state.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.downstream.complete();
        self.state.worker.dispose();
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Emits the first item, then ignores items until `window` elapsed. A dropped item
    /// never extends the window.
    pub fn throttle_first(&self, window: Duration, scheduler: SchedulerRef) -> Self {
        Self::assemble(ThrottleFirst {
            source: self.clone(),
            window,
            scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Emitter;
    use crate::schedulers::Schedulers;
    use crate::test_support::Recorder;

    fn clicks(at: Vec<u64>) -> Observable<u64> {
        Observable::create(move |e: Emitter<u64>| {
            let at = at.clone();
            tokio::spawn(async move {
                let start = tokio::time::Instant::now();
                for ms in at {
                    tokio::time::sleep_until(start + Duration::from_millis(ms)).await;
                    e.on_next(ms);
                }
                e.on_complete();
            });
            Ok(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_item_of_each_window_passes() {
        let rec = Recorder::new();
        clicks(vec![0, 10, 1100])
            .throttle_first(Duration::from_millis(1000), Schedulers::current().unwrap())
            .subscribe(rec.boxed())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(rec.values(), vec![0, 1100]);
        assert!(rec.is_completed());
        rec.assert_protocol();
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_items_do_not_extend_the_window() {
        let rec = Recorder::new();
        clicks(vec![0, 400, 800, 1000, 1200])
            .throttle_first(Duration::from_millis(500), Schedulers::current().unwrap())
            .subscribe(rec.boxed())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(rec.values(), vec![0, 800]);
    }
}

//! `interval`: a periodic counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::disposables::{Disposable, DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::observable::{Observable, ObservableSource};
use crate::observers::BoxObserver;
use crate::schedulers::SchedulerRef;

struct Interval {
    initial: Duration,
    period: Duration,
    scheduler: SchedulerRef,
}

struct Ticker {
    downstream: Mutex<BoxObserver<u64>>,
    count: AtomicU64,
    resource: DisposableCell,
}

impl Ticker {
    fn tick(&self) {
        if self.resource.is_disposed() {
            return;
        }
        let n = self.count.fetch_add(1, Ordering::Relaxed);
        self.downstream.lock().on_next(n);
    }
}

impl Disposable for Ticker {
    fn dispose(&self) {
        self.resource.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.resource.is_disposed()
    }
}

impl ObservableSource<u64> for Interval {
    fn subscribe_actual(&self, observer: BoxObserver<u64>) -> Result<(), RxError> {
        let ticker = Arc::new(Ticker {
            downstream: Mutex::new(observer),
            count: AtomicU64::new(0),
            resource: DisposableCell::new(),
        });
        let handle: DisposableRef = ticker.clone();
        ticker.downstream.lock().on_subscribe(handle);

        let t = Arc::clone(&ticker);
        let periodic = self.scheduler.schedule_periodic_direct(
            Arc::new(move || t.tick()),
            self.initial,
            self.period,
        );
        ticker.resource.set_once(periodic);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "interval"
    }
}

impl Observable<u64> {
    /// Emits `0, 1, 2, ...`: the first after `initial`, then one every `period` at a fixed
    /// rate. Never completes.
    pub fn interval(initial: Duration, period: Duration, scheduler: SchedulerRef) -> Self {
        Self::assemble(Interval {
            initial,
            period,
            scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedulers::Schedulers;
    use crate::test_support::Recorder;

    #[tokio::test(start_paused = true)]
    async fn ticks_are_spaced_by_the_period() {
        let start = tokio::time::Instant::now();
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&stamps);
        let handle = Observable::interval(
            Duration::ZERO,
            Duration::from_millis(100),
            Schedulers::current().unwrap(),
        )
        .subscribe_next(move |n| s.lock().push((n, start.elapsed().as_millis())))
        .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        handle.dispose();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*stamps.lock(), vec![(0, 0), (1, 100), (2, 200)]);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_the_ticks() {
        let rec = Recorder::new();
        Observable::interval(
            Duration::from_millis(10),
            Duration::from_millis(10),
            Schedulers::current().unwrap(),
        )
        .subscribe(rec.boxed())
        .unwrap();
        tokio::time::sleep(Duration::from_millis(35)).await;
        rec.dispose();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rec.values(), vec![0, 1, 2]);
        assert_eq!(rec.terminal_count(), 0);
    }
}

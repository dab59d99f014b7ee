//! `subscribe_on`: run the upstream subscribe on a scheduler.

use std::sync::Arc;
use std::time::Duration;

use crate::disposables::{Disposable, DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer};
use crate::schedulers::SchedulerRef;

struct SubscribeOn<T> {
    source: Observable<T>,
    scheduler: SchedulerRef,
}

/// Handle given downstream: cancels both the pending subscribe task and the upstream.
struct Parent {
    upstream: DisposableCell,
    task: DisposableCell,
}

impl Disposable for Parent {
    fn dispose(&self) {
        self.upstream.dispose();
        self.task.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.upstream.is_disposed()
    }
}

struct SubscribeOnObserver<T> {
    downstream: BoxObserver<T>,
    parent: Arc<Parent>,
}

impl<T: Send> Observer<T> for SubscribeOnObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        self.parent.upstream.set_once(d);
    }

    fn on_next(&mut self, value: T) {
        self.downstream.on_next(value);
    }

    fn on_error(&mut self, error: RxError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }
}

impl<T: Send + 'static> ObservableSource<T> for SubscribeOn<T> {
    fn subscribe_actual(&self, mut observer: BoxObserver<T>) -> Result<(), RxError> {
        let parent = Arc::new(Parent {
            upstream: DisposableCell::new(),
            task: DisposableCell::new(),
        });
        let handle: DisposableRef = parent.clone();
        observer.on_subscribe(handle);

        let source = self.source.clone();
        let upstream = SubscribeOnObserver {
            downstream: observer,
            parent: Arc::clone(&parent),
        };
        let task = self.scheduler.schedule_direct(
            Box::new(move || {
                if let Err(error) = source.subscribe(Box::new(upstream)) {
                    tracing::debug!(err = %error, "subscribe_on: upstream subscribe failed");
                }
            }),
            Duration::ZERO,
        );
        parent.task.set(task);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "subscribe_on"
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Subscribes to this observable on `scheduler`; signals are delivered on whatever
    /// thread the upstream emits on.
    pub fn subscribe_on(&self, scheduler: SchedulerRef) -> Self {
        Self::assemble(SubscribeOn {
            source: self.clone(),
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

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn upstream_subscribes_on_the_scheduler() {
        let scheduler = Schedulers::current().unwrap();
        let caller = std::thread::current().id();
        let threads = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let t = Arc::clone(&threads);
        let rec = Recorder::<u8>::new();
        Observable::create(move |e: Emitter<u8>| {
            t.lock().push(std::thread::current().id());
            e.on_next(1u8);
            e.on_complete();
            Ok(())
        })
        .subscribe_on(scheduler)
        .subscribe(rec.boxed())
        .unwrap();

        let rec2 = rec.clone();
        tokio::task::spawn_blocking(move || rec2.await_terminal(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(rec.values(), vec![1]);
        assert_eq!(threads.lock().len(), 1);
        assert_ne!(threads.lock()[0], caller);
        rec.assert_protocol();
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_before_the_task_runs_skips_the_subscribe() {
        let scheduler = Schedulers::current().unwrap();
        let subscribed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let s = Arc::clone(&subscribed);
        let rec = Recorder::<u8>::new();
        Observable::create(move |_e: Emitter<u8>| {
            s.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
        .subscribe_on(scheduler)
        .subscribe(rec.boxed())
        .unwrap();
        rec.dispose();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!subscribed.load(std::sync::atomic::Ordering::SeqCst));
    }
}

//! # Queue-and-drain serialization.
//!
//! [`SerializedObserver`] lets several threads signal one downstream observer without ever
//! overlapping calls and without blocking a thread while another one is emitting.
//!
//! ## Architecture
//! ```text
//! thread A: next(1) ──► state lock: emitting? no ──► emitting = true ──► downstream(1)
//! thread B: next(2) ──► state lock: emitting? yes ──► queue.push(Next(2)) ──► return
//! thread A: drain   ──► state lock: take queue ──► downstream(2) ──► queue empty ──► emitting = false
//! ```
//!
//! ## Rules
//! - Terminal signals are accepted once; later `error` goes to the plugin hub, later
//!   `complete` is dropped.
//! - Without `delay_error` an error queued behind values overtakes them.
//! - The downstream lock is only taken by the emitting thread, so it never contends.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxObserver, Observer};
use crate::config;
use crate::disposables::DisposableRef;
use crate::error::RxError;
use crate::notification::{AppendOnlyList, Notification};
use crate::plugins::Plugins;

struct State<T> {
    emitting: bool,
    done: bool,
    queue: Option<AppendOnlyList<Notification<T>>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    downstream: Mutex<BoxObserver<T>>,
    delay_error: bool,
}

/// A cloneable, thread-safe handle that serializes signals to one downstream observer.
pub struct SerializedObserver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SerializedObserver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> SerializedObserver<T> {
    /// Wraps `downstream`. With `delay_error` an error waits behind already queued items.
    pub fn new(downstream: BoxObserver<T>, delay_error: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    emitting: false,
                    done: false,
                    queue: None,
                }),
                downstream: Mutex::new(downstream),
                delay_error,
            }),
        }
    }

    /// Forwards the upstream handle. Must happen before any other signal.
    pub fn subscribe(&self, d: DisposableRef) {
        self.shared.downstream.lock().on_subscribe(d);
    }

    /// Whether a terminal signal was accepted.
    pub fn is_done(&self) -> bool {
        self.shared.state.lock().done
    }

    /// Emits an item, or queues it if another thread is emitting.
    pub fn next(&self, value: T) {
        {
            let mut state = self.shared.state.lock();
            if state.done {
                return;
            }
            if state.emitting {
                enqueue(&mut state).push(Notification::Next(value));
                return;
            }
            state.emitting = true;
        }
        self.shared.downstream.lock().on_next(value);
        self.drain();
    }

    /// Emits the terminal failure.
    pub fn error(&self, error: RxError) {
        {
            let mut state = self.shared.state.lock();
            if state.done {
                drop(state);
                Plugins::global().on_error(error);
                return;
            }
            state.done = true;
            if state.emitting {
                let delay_error = self.shared.delay_error;
                let queue = enqueue(&mut state);
                if delay_error {
                    queue.push(Notification::Error(error));
                } else {
                    queue.set_first(Notification::Error(error));
                }
                return;
            }
            state.emitting = true;
        }
        self.shared.downstream.lock().on_error(error);
    }

    /// Emits normal completion.
    pub fn complete(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.done {
                return;
            }
            state.done = true;
            if state.emitting {
                enqueue(&mut state).push(Notification::Complete);
                return;
            }
            state.emitting = true;
        }
        self.shared.downstream.lock().on_complete();
    }

    fn drain(&self) {
        loop {
            let batch = {
                let mut state = self.shared.state.lock();
                match state.queue.take() {
                    Some(batch) => batch,
                    None => {
                        state.emitting = false;
                        return;
                    }
                }
            };
            let mut downstream = self.shared.downstream.lock();
            if batch.accept_all(&mut *downstream) {
                return;
            }
        }
    }
}

fn enqueue<T>(state: &mut State<T>) -> &mut AppendOnlyList<Notification<T>> {
    state
        .queue
        .get_or_insert_with(|| AppendOnlyList::new(config::buffer_size().min(16)))
}

impl<T: Send + 'static> Observer<T> for SerializedObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        self.subscribe(d);
    }

    fn on_next(&mut self, value: T) {
        self.next(value);
    }

    fn on_error(&mut self, error: RxError) {
        self.error(error);
    }

    fn on_complete(&mut self) {
        self.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposables::empty;
    use crate::test_support::Recorder;

    /// Re-enters the serializer from inside `on_next` to force the queued path.
    struct Reentrant {
        inner: BoxObserver<u32>,
        serializer: Arc<Mutex<Option<SerializedObserver<u32>>>>,
        delay_error: bool,
    }

    impl Observer<u32> for Reentrant {
        fn on_subscribe(&mut self, d: DisposableRef) {
            self.inner.on_subscribe(d);
        }

        fn on_next(&mut self, value: u32) {
            self.inner.on_next(value);
            if value == 1 {
                let s = self.serializer.lock().clone();
                if let Some(s) = s {
                    s.next(2);
                    s.next(3);
                    if self.delay_error {
                        s.error(RxError::illegal_state("late"));
                    } else {
                        s.error(RxError::illegal_state("overtakes"));
                    }
                }
            }
        }

        fn on_error(&mut self, error: RxError) {
            self.inner.on_error(error);
        }

        fn on_complete(&mut self) {
            self.inner.on_complete();
        }
    }

    fn reentrant(delay_error: bool) -> (Recorder<u32>, SerializedObserver<u32>) {
        let rec = Recorder::new();
        let slot = Arc::new(Mutex::new(None));
        let serializer = SerializedObserver::new(
            Box::new(Reentrant {
                inner: rec.boxed(),
                serializer: Arc::clone(&slot),
                delay_error,
            }),
            delay_error,
        );
        *slot.lock() = Some(serializer.clone());
        serializer.subscribe(empty());
        (rec, serializer)
    }

    #[test]
    fn queued_values_are_drained_in_order() {
        let (rec, s) = reentrant(true);
        s.next(1);
        assert_eq!(rec.values(), vec![1, 2, 3]);
        assert!(rec.error().is_some());
        assert!(s.is_done());
    }

    #[test]
    fn error_overtakes_queued_values_without_delay_error() {
        let (rec, s) = reentrant(false);
        s.next(1);
        assert_eq!(rec.values(), vec![1]);
        assert!(rec.error().is_some());
    }

    #[test]
    fn terminal_is_delivered_once() {
        let rec = Recorder::<u32>::new();
        let s = SerializedObserver::new(rec.boxed(), false);
        s.subscribe(empty());
        s.complete();
        s.complete();
        s.next(9);
        assert!(rec.is_completed());
        assert!(rec.values().is_empty());
        assert_eq!(rec.terminal_count(), 1);
    }

    #[test]
    fn concurrent_producers_never_overlap() {
        let rec = Recorder::<u32>::new();
        let s = SerializedObserver::new(rec.boxed(), false);
        s.subscribe(empty());
        std::thread::scope(|scope| {
            for t in 0..4u32 {
                let s = s.clone();
                scope.spawn(move || {
                    for i in 0..250 {
                        s.next(t * 1000 + i);
                    }
                });
            }
        });
        s.complete();
        let values = rec.values();
        assert_eq!(values.len(), 1000);
        for t in 0..4u32 {
            let lane: Vec<_> = values.iter().filter(|v| **v / 1000 == t).copied().collect();
            assert!(lane.windows(2).all(|w| w[0] < w[1]));
        }
        assert!(rec.is_completed());
    }
}

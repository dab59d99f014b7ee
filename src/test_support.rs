//! Recording observer and helpers shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::disposables::{Disposable, DisposableRef};
use crate::error::RxError;
use crate::observers::{BoxObserver, Observer};

/// Serializes tests that install hooks on the global plugin registry.
pub(crate) static GLOBAL_HOOKS: Mutex<()> = Mutex::new(());

/// One received signal, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event<T> {
    Subscribe,
    Next(T),
    Error(String),
    Complete,
}

struct State<T> {
    events: Vec<Event<T>>,
    errors: Vec<RxError>,
    upstream: Option<DisposableRef>,
}

/// Shared view of everything a [`RecordingObserver`] received.
pub(crate) struct Recorder<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                events: Vec::new(),
                errors: Vec::new(),
                upstream: None,
            })),
        }
    }

    pub(crate) fn observer(&self) -> RecordingObserver<T> {
        RecordingObserver {
            state: Arc::clone(&self.state),
        }
    }

    pub(crate) fn boxed(&self) -> BoxObserver<T> {
        Box::new(self.observer())
    }

    pub(crate) fn events(&self) -> Vec<Event<T>> {
        self.state.lock().events.clone()
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn error(&self) -> Option<RxError> {
        self.state.lock().errors.first().cloned()
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.state
            .lock()
            .events
            .iter()
            .any(|e| matches!(e, Event::Complete))
    }

    pub(crate) fn subscribe_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Subscribe))
            .count()
    }

    pub(crate) fn terminal_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Complete | Event::Error(_)))
            .count()
    }

    /// Disposes the upstream handle received in `on_subscribe`.
    pub(crate) fn dispose(&self) {
        let upstream = self.state.lock().upstream.clone();
        if let Some(d) = upstream {
            d.dispose();
        }
    }

    /// Asserts the observer protocol: one subscribe first, at most one terminal, last.
    pub(crate) fn assert_protocol(&self) {
        let events = self.events();
        assert!(
            matches!(events.first(), Some(Event::Subscribe)),
            "on_subscribe must come first: {:?}",
            events.len()
        );
        assert_eq!(self.subscribe_count(), 1, "on_subscribe exactly once");
        let terminals = self.terminal_count();
        assert!(terminals <= 1, "at most one terminal signal, got {terminals}");
        if terminals == 1 {
            assert!(
                matches!(events.last(), Some(Event::Complete | Event::Error(_))),
                "terminal signal must be last"
            );
        }
    }

    /// Polls until `n` items arrived or `timeout` elapsed (real-time tests only).
    pub(crate) fn await_count(&self, n: usize, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.values().len() >= n {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.values().len() >= n
    }

    /// Polls until a terminal signal arrived or `timeout` elapsed (real-time tests only).
    pub(crate) fn await_terminal(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.terminal_count() > 0 {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.terminal_count() > 0
    }
}

/// Observer half of a [`Recorder`].
pub(crate) struct RecordingObserver<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Send> Observer<T> for RecordingObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        let mut state = self.state.lock();
        state.events.push(Event::Subscribe);
        state.upstream = Some(d);
    }

    fn on_next(&mut self, value: T) {
        self.state.lock().events.push(Event::Next(value));
    }

    fn on_error(&mut self, error: RxError) {
        let mut state = self.state.lock();
        state.events.push(Event::Error(error.as_label().to_string()));
        state.errors.push(error);
    }

    fn on_complete(&mut self) {
        self.state.lock().events.push(Event::Complete);
    }
}

/// Installs a capturing error handler on the global registry for the duration of `f`.
///
/// Holds [`GLOBAL_HOOKS`] so tests installing global hooks never overlap.
pub(crate) fn with_global_errors<R>(f: impl FnOnce(&Arc<Mutex<Vec<RxError>>>) -> R) -> R {
    let _lock = GLOBAL_HOOKS.lock();
    let plugins = crate::plugins::Plugins::global();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    plugins
        .set_error_handler(Some(Arc::new(move |e: RxError| sink.lock().push(e))))
        .unwrap();
    let result = f(&seen);
    plugins.set_error_handler(None).unwrap();
    result
}

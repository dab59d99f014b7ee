//! # Observers built from loose callbacks.
//!
//! [`SubscriberBuilder`] collects callbacks one `with`-style call at a time, then
//! subscribes a [`LambdaObserver`] and returns its cancellation handle.
//!
//! ## Rules
//! - Unset callbacks are no-ops, except `on_error`: a missing error callback installs a
//!   guard that reports [`RxError::OnErrorNotImplemented`] to the plugin hub.
//! - After a terminal signal or a dispose, nothing else is delivered; a late error goes to
//!   the plugin hub.

use std::sync::Arc;

use crate::disposables::{DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::functions;
use crate::observable::Observable;
use crate::observers::Observer;

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type ErrorFn = Box<dyn FnOnce(RxError) + Send>;
type CompleteFn = Box<dyn FnOnce() + Send>;
type SubscribeFn = Box<dyn FnOnce(&DisposableRef) + Send>;

/// An observer that forwards every signal to a callback.
pub struct LambdaObserver<T> {
    on_next: NextFn<T>,
    on_error: Option<ErrorFn>,
    on_complete: Option<CompleteFn>,
    on_subscribe: Option<SubscribeFn>,
    upstream: Arc<DisposableCell>,
}

impl<T> LambdaObserver<T> {
    /// Handle that cancels this observer's upstream.
    pub fn handle(&self) -> DisposableRef {
        self.upstream.clone()
    }

    fn is_disposed(&self) -> bool {
        self.upstream.is_disposed()
    }
}

impl<T: Send> Observer<T> for LambdaObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        if self.upstream.set_once(d) {
            if let Some(callback) = self.on_subscribe.take() {
                let handle: DisposableRef = self.upstream.clone();
                callback(&handle);
            }
        }
    }

    fn on_next(&mut self, value: T) {
        if !self.is_disposed() {
            (self.on_next)(value);
        }
    }

    fn on_error(&mut self, error: RxError) {
        match self.on_error.take() {
            Some(callback) if !self.is_disposed() => {
                self.on_complete = None;
                self.upstream.dispose();
                callback(error);
            }
            _ => crate::plugins::Plugins::global().on_error(error),
        }
    }

    fn on_complete(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.on_error = None;
        self.upstream.dispose();
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
    }
}

/// Builder for a callback-based subscription, obtained from
/// [`Observable::subscriber`](crate::Observable::subscriber).
///
/// # Example
/// ```
/// use std::sync::{Arc, Mutex};
/// use rxvisor::Observable;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// Observable::from_iter(vec![1, 2, 3])
///     .subscriber()
///     .on_next(move |v| sink.lock().unwrap().push(v))
///     .on_error(|e| eprintln!("failed: {e}"))
///     .on_complete(|| println!("done"))
///     .subscribe()
///     .unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
/// ```
#[must_use = "nothing happens until `subscribe` is called"]
pub struct SubscriberBuilder<T> {
    source: Observable<T>,
    on_next: Option<NextFn<T>>,
    on_error: Option<ErrorFn>,
    on_complete: Option<CompleteFn>,
    on_subscribe: Option<SubscribeFn>,
}

impl<T: Send + 'static> SubscriberBuilder<T> {
    pub(crate) fn new(source: Observable<T>) -> Self {
        Self {
            source,
            on_next: None,
            on_error: None,
            on_complete: None,
            on_subscribe: None,
        }
    }

    /// Callback for every item.
    pub fn on_next(mut self, f: impl FnMut(T) + Send + 'static) -> Self {
        self.on_next = Some(Box::new(f));
        self
    }

    /// Callback for the terminal failure.
    pub fn on_error(mut self, f: impl FnOnce(RxError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Callback for normal completion.
    pub fn on_complete(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Callback receiving the cancellation handle before any item.
    pub fn on_subscribe(mut self, f: impl FnOnce(&DisposableRef) + Send + 'static) -> Self {
        self.on_subscribe = Some(Box::new(f));
        self
    }

    /// Builds the observer without subscribing it.
    pub fn build(self) -> (Observable<T>, LambdaObserver<T>) {
        let observer = LambdaObserver {
            on_next: self
                .on_next
                .unwrap_or_else(|| -> NextFn<T> { Box::new(functions::noop::<T>) }),
            on_error: Some(
                self.on_error
                    .unwrap_or_else(|| -> ErrorFn { Box::new(functions::on_error_missing) }),
            ),
            on_complete: Some(
                self.on_complete
                    .unwrap_or_else(|| -> CompleteFn { Box::new(functions::noop_action) }),
            ),
            on_subscribe: self.on_subscribe,
            upstream: Arc::new(DisposableCell::new()),
        };
        (self.source, observer)
    }

    /// Subscribes and returns the handle that cancels the subscription.
    pub fn subscribe(self) -> Result<DisposableRef, RxError> {
        let (source, observer) = self.build();
        let handle = observer.handle();
        source.subscribe(Box::new(observer))?;
        Ok(handle)
    }
}

//! # `Observable::create`: bridging callback-style producers.
//!
//! The producer closure receives an [`Emitter`]. It may keep it, move it to another
//! thread, and emit at any pace as long as calls are not concurrent.
//!
//! ## Rules
//! - Signals after a terminal or after the downstream disposed are dropped.
//! - An error after termination goes to the plugin hub.
//! - Terminal signals dispose the attached resource (see
//!   [`set_disposable`](Emitter::set_disposable)).
//! - A producer that returns `Err` terminates the sequence with that error.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::disposables::{ActionDisposable, Disposable, DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::observable::{Observable, ObservableSource};
use crate::observers::BoxObserver;
use crate::plugins::Plugins;

type Producer<T> = Arc<dyn Fn(Emitter<T>) -> Result<(), RxError> + Send + Sync>;

struct Shared<T> {
    downstream: Mutex<BoxObserver<T>>,
    resource: DisposableCell,
}

impl<T: Send + 'static> Disposable for Shared<T> {
    fn dispose(&self) {
        self.resource.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.resource.is_disposed()
    }
}

/// Push handle given to a `create` producer.
pub struct Emitter<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Emitter<T> {
    /// Emits an item unless the sequence is over.
    pub fn on_next(&self, value: T) {
        if !self.is_disposed() {
            self.shared.downstream.lock().on_next(value);
        }
    }

    /// Terminates with `error`; after termination the error goes to the plugin hub.
    pub fn on_error(&self, error: RxError) {
        if let Err(error) = self.try_on_error(error) {
            Plugins::global().on_error(error);
        }
    }

    /// Terminates with `error`, handing it back if the sequence is already over.
    pub fn try_on_error(&self, error: RxError) -> Result<(), RxError> {
        if self.is_disposed() {
            return Err(error);
        }
        self.shared.downstream.lock().on_error(error);
        self.shared.resource.dispose();
        Ok(())
    }

    /// Completes the sequence.
    pub fn on_complete(&self) {
        if !self.is_disposed() {
            self.shared.downstream.lock().on_complete();
            self.shared.resource.dispose();
        }
    }

    /// Attaches a resource released on termination or dispose; replaces and disposes the
    /// previous one.
    pub fn set_disposable(&self, d: DisposableRef) {
        self.shared.resource.set(d);
    }

    /// Attaches a cleanup action, as [`set_disposable`](Emitter::set_disposable).
    pub fn set_cancellable(&self, action: impl FnOnce() + Send + 'static) {
        self.set_disposable(Arc::new(ActionDisposable::new(action)));
    }

    /// Whether the downstream disposed or a terminal signal was emitted.
    pub fn is_disposed(&self) -> bool {
        self.shared.resource.is_disposed()
    }
}

struct Create<T> {
    producer: Producer<T>,
}

impl<T: Send + 'static> ObservableSource<T> for Create<T> {
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        let shared = Arc::new(Shared {
            downstream: Mutex::new(observer),
            resource: DisposableCell::new(),
        });
        let handle: DisposableRef = shared.clone();
        shared.downstream.lock().on_subscribe(handle);

        let guard = Emitter {
            shared: Arc::clone(&shared),
        };
        if let Err(error) = (self.producer)(Emitter { shared }) {
            guard.on_error(error);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "create"
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Builds an observable from a producer invoked once per subscription.
    ///
    /// # Example
    /// ```
    /// use rxvisor::{Emitter, Observable};
    ///
    /// let numbers = Observable::create(|emitter: Emitter<i32>| {
    ///     for i in 0..3 {
    ///         emitter.on_next(i);
    ///     }
    ///     emitter.on_complete();
    ///     Ok(())
    /// });
    /// numbers.subscribe_next(|v| println!("{v}")).unwrap();
    /// ```
    pub fn create(
        producer: impl Fn(Emitter<T>) -> Result<(), RxError> + Send + Sync + 'static,
    ) -> Self {
        Self::assemble(Create {
            producer: Arc::new(producer),
        })
    }
}

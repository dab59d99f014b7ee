//! # The producer type and the subscribe handshake.
//!
//! ## Architecture
//! ```text
//! assembly (build time):
//!   Observable::just(1).map(f).filter(p)
//!     └─► Filter { Map { Just } }   each step passes through Plugins::on_assembly
//!
//! subscribe (run time):
//!   subscribe(observer)
//!     ├─► Plugins::on_subscribe(name, observer)    may substitute; None → RxError::Null
//!     └─► subscribe_actual(observer)
//!           ├─ Ok                                  done
//!           ├─ Err(SubscribeFailed)                returned as-is (already reported)
//!           └─ Err(e)                              Plugins::on_error(e), then SubscribeFailed(e)
//! ```
//!
//! Panics are not intercepted here: they unwind to the caller untouched.

use std::sync::Arc;

use crate::disposables::DisposableRef;
use crate::error::RxError;
use crate::observers::{BoxObserver, Observer, SubscriberBuilder};
use crate::plugins::Plugins;

/// The behavior behind an [`Observable`]: one implementation per operator.
pub trait ObservableSource<T>: Send + Sync + 'static {
    /// Wires `observer` to this source. Must call `observer.on_subscribe` before anything
    /// else.
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError>;

    /// Operator name, reported to the assembly and subscribe hooks.
    fn name(&self) -> &'static str;
}

/// An immutable, cheaply cloneable description of a push-based sequence.
///
/// Nothing runs until [`subscribe`](Observable::subscribe); every subscription runs the
/// chain independently.
///
/// # Example
/// ```
/// use rxvisor::Observable;
///
/// let doubled = Observable::from_iter(vec![1, 2, 3]).map(|v| v * 2);
/// let d = doubled.subscribe_next(|v| println!("{v}")).unwrap();
/// assert!(d.is_disposed()); // the source completed synchronously
/// # use rxvisor::Disposable;
/// ```
pub struct Observable<T> {
    source: Arc<dyn ObservableSource<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Wraps a custom operator without consulting the assembly hook.
    pub fn from_source(source: impl ObservableSource<T>) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Wraps an operator and passes the result through the assembly hook.
    pub(crate) fn assemble(source: impl ObservableSource<T>) -> Self {
        let name = source.name();
        Plugins::global().on_assembly(name, Self::from_source(source))
    }

    /// Name of the outermost operator.
    pub fn name(&self) -> &'static str {
        self.source.name()
    }

    /// Whether both handles describe the very same operator instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }

    /// Subscribes `observer`.
    ///
    /// # Errors
    /// - [`RxError::Null`] if the subscribe hook returned no observer
    /// - [`RxError::SubscribeFailed`] if the operator failed while wiring itself; the cause
    ///   has already been reported to [`Plugins::on_error`]
    pub fn subscribe(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        let plugins = Plugins::global();
        let observer = plugins.on_subscribe(self.source.name(), observer)?;
        match self.source.subscribe_actual(observer) {
            Ok(()) => Ok(()),
            Err(err @ RxError::SubscribeFailed { .. }) => Err(err),
            Err(err) => {
                plugins.on_error(err.clone());
                Err(RxError::SubscribeFailed {
                    cause: Arc::new(err),
                })
            }
        }
    }

    /// Subscribes any observer value.
    pub fn subscribe_with(&self, observer: impl Observer<T> + 'static) -> Result<(), RxError> {
        self.subscribe(Box::new(observer))
    }

    /// Starts a callback-based subscription.
    pub fn subscriber(&self) -> SubscriberBuilder<T> {
        SubscriberBuilder::new(self.clone())
    }

    /// Subscribes with only an item callback; errors go to the missing-handler guard.
    pub fn subscribe_next(
        &self,
        on_next: impl FnMut(T) + Send + 'static,
    ) -> Result<DisposableRef, RxError> {
        self.subscriber().on_next(on_next).subscribe()
    }

    /// Applies a converter to this observable (e.g. to bridge into another API).
    pub fn to<R>(&self, converter: impl FnOnce(&Observable<T>) -> R) -> R {
        converter(self)
    }
}

impl<T: 'static> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.source.name())
            .finish()
    }
}

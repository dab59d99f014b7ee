//! Type-erased carriers for the generic assembly and subscribe hooks.

use std::any::Any;

use crate::observable::Observable;
use crate::observers::BoxObserver;

/// A freshly assembled [`Observable`] travelling through the assembly hook.
pub struct Assembly {
    name: &'static str,
    observable: Box<dyn Any + Send + Sync>,
}

impl Assembly {
    pub(crate) fn new<T: Send + 'static>(name: &'static str, observable: Observable<T>) -> Self {
        Self {
            name,
            observable: Box::new(observable),
        }
    }

    /// Name of the operator that produced the observable (e.g. `"map"`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Borrows the observable if its element type is `T`.
    pub fn downcast_ref<T: Send + 'static>(&self) -> Option<&Observable<T>> {
        self.observable.downcast_ref::<Observable<T>>()
    }

    /// Replaces the observable through `f` if its element type is `T`; otherwise returns
    /// `self` unchanged.
    ///
    /// Operators built inside `f` are not passed through the assembly hook again.
    ///
    /// # Example
    /// ```
    /// use rxvisor::Assembly;
    ///
    /// fn hook(a: Assembly) -> Assembly {
    ///     a.map::<i32>(|obs| obs.filter(|v| *v > 0))
    /// }
    /// # let _ = hook;
    /// ```
    pub fn map<T: Send + 'static>(
        self,
        f: impl FnOnce(Observable<T>) -> Observable<T>,
    ) -> Self {
        match self.observable.downcast::<Observable<T>>() {
            Ok(obs) => Self {
                name: self.name,
                observable: Box::new(f(*obs)),
            },
            Err(observable) => Self {
                name: self.name,
                observable,
            },
        }
    }

    pub(crate) fn into_observable<T: Send + 'static>(self) -> Option<Observable<T>> {
        self.observable.downcast::<Observable<T>>().ok().map(|b| *b)
    }
}

impl std::fmt::Debug for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembly").field("name", &self.name).finish()
    }
}

/// What the subscribe hook learns about the subscription being made.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeInfo {
    /// Name of the operator being subscribed to.
    pub source: &'static str,
}

/// A boxed observer of unknown element type.
pub struct AnyObserver {
    inner: Box<dyn Any + Send>,
}

impl AnyObserver {
    /// Erases the element type of `observer`.
    pub fn new<T: 'static>(observer: BoxObserver<T>) -> Self {
        Self {
            inner: Box::new(observer),
        }
    }

    /// Whether the erased observer accepts items of type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.is::<BoxObserver<T>>()
    }

    /// Recovers the typed observer, or gives `self` back on a type mismatch.
    pub fn downcast<T: 'static>(self) -> Result<BoxObserver<T>, Self> {
        match self.inner.downcast::<BoxObserver<T>>() {
            Ok(obs) => Ok(*obs),
            Err(inner) => Err(Self { inner }),
        }
    }

    /// Wraps the observer through `f` if its element type is `T`; otherwise returns `self`
    /// unchanged.
    pub fn wrap<T: 'static>(self, f: impl FnOnce(BoxObserver<T>) -> BoxObserver<T>) -> Self {
        match self.downcast::<T>() {
            Ok(obs) => Self::new(f(obs)),
            Err(this) => this,
        }
    }
}

impl std::fmt::Debug for AnyObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AnyObserver")
    }
}

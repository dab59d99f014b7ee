//! Synchronous factories: `empty`, `just`, `from_iter`, `error`.
//!
//! Each emits everything during `subscribe`, checking its own cancellation token before
//! every signal so a downstream that disposes mid-sequence stops the loop.

use crate::disposables::{BooleanDisposable, Disposable, DisposableRef};
use crate::error::RxError;
use crate::observable::{Observable, ObservableSource};
use crate::observers::BoxObserver;

struct Empty;

impl<T: Send + 'static> ObservableSource<T> for Empty {
    fn subscribe_actual(&self, mut observer: BoxObserver<T>) -> Result<(), RxError> {
        observer.on_subscribe(crate::disposables::disposed());
        observer.on_complete();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "empty"
    }
}

struct FromIter<T> {
    items: Vec<T>,
    name: &'static str,
}

impl<T: Clone + Send + Sync + 'static> ObservableSource<T> for FromIter<T> {
    fn subscribe_actual(&self, mut observer: BoxObserver<T>) -> Result<(), RxError> {
        let token = BooleanDisposable::arc();
        let handle: DisposableRef = token.clone();
        observer.on_subscribe(handle);
        for item in &self.items {
            if token.is_disposed() {
                return Ok(());
            }
            observer.on_next(item.clone());
        }
        if !token.is_disposed() {
            token.dispose();
            observer.on_complete();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

struct Fail {
    error: RxError,
}

impl<T: Send + 'static> ObservableSource<T> for Fail {
    fn subscribe_actual(&self, mut observer: BoxObserver<T>) -> Result<(), RxError> {
        observer.on_subscribe(crate::disposables::disposed());
        observer.on_error(self.error.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "error"
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Completes immediately without items.
    pub fn empty() -> Self {
        Self::assemble(Empty)
    }

    /// Fails immediately with `error`.
    pub fn error(error: RxError) -> Self {
        Self::assemble(Fail { error })
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Emits `value`, then completes.
    pub fn just(value: T) -> Self {
        Self::assemble(FromIter {
            items: vec![value],
            name: "just",
        })
    }

    /// Emits every item of `items` in order, then completes.
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter(items: impl IntoIterator<Item = T>) -> Self {
        Self::assemble(FromIter {
            items: items.into_iter().collect(),
            name: "from_iter",
        })
    }
}

impl<T> From<Vec<T>> for Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(items: Vec<T>) -> Self {
        Observable::from_iter(items)
    }
}

//! `map` / `try_map`.

use std::sync::Arc;

use crate::disposables::DisposableRef;
use crate::error::RxError;
use crate::observable::stage::Stage;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer};

type MapFn<T, U> = Arc<dyn Fn(T) -> Result<U, RxError> + Send + Sync>;

struct Map<T, U> {
    source: Observable<T>,
    f: MapFn<T, U>,
}

impl<T: Send + 'static, U: Send + 'static> ObservableSource<U> for Map<T, U> {
    fn subscribe_actual(&self, observer: BoxObserver<U>) -> Result<(), RxError> {
        self.source.subscribe(Box::new(MapObserver {
            stage: Stage::new(observer),
            f: Arc::clone(&self.f),
        }))
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

struct MapObserver<T, U> {
    stage: Stage<U>,
    f: MapFn<T, U>,
}

impl<T: Send, U: Send> Observer<T> for MapObserver<T, U> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        self.stage.subscribe(d);
    }

    fn on_next(&mut self, value: T) {
        if self.stage.is_done() {
            return;
        }
        match (self.f)(value) {
            Ok(mapped) => self.stage.next(mapped),
            Err(error) => self.stage.fail(error),
        }
    }

    fn on_error(&mut self, error: RxError) {
        self.stage.error(error);
    }

    fn on_complete(&mut self) {
        self.stage.complete();
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Transforms every item with `f`.
    pub fn map<U: Send + 'static>(
        &self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Observable<U> {
        self.try_map(move |v| Ok(f(v)))
    }

    /// Transforms every item with a fallible `f`; the first `Err` cancels upstream and
    /// terminates the sequence with it.
    pub fn try_map<U: Send + 'static>(
        &self,
        f: impl Fn(T) -> Result<U, RxError> + Send + Sync + 'static,
    ) -> Observable<U> {
        Observable::assemble(Map {
            source: self.clone(),
            f: Arc::new(f),
        })
    }
}

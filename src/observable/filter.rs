//! `filter` / `try_filter`.

use std::sync::Arc;

use crate::disposables::DisposableRef;
use crate::error::RxError;
use crate::observable::stage::Stage;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer};

type Predicate<T> = Arc<dyn Fn(&T) -> Result<bool, RxError> + Send + Sync>;

struct Filter<T> {
    source: Observable<T>,
    predicate: Predicate<T>,
}

impl<T: Send + 'static> ObservableSource<T> for Filter<T> {
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        self.source.subscribe(Box::new(FilterObserver {
            stage: Stage::new(observer),
            predicate: Arc::clone(&self.predicate),
        }))
    }

    fn name(&self) -> &'static str {
        "filter"
    }
}

struct FilterObserver<T> {
    stage: Stage<T>,
    predicate: Predicate<T>,
}

impl<T: Send> Observer<T> for FilterObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        self.stage.subscribe(d);
    }

    fn on_next(&mut self, value: T) {
        if self.stage.is_done() {
            return;
        }
        match (self.predicate)(&value) {
            Ok(true) => self.stage.next(value),
            Ok(false) => {}
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
    /// Keeps only the items matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.try_filter(move |v| Ok(predicate(v)))
    }

    /// Keeps only the items matching a fallible `predicate`; the first `Err` cancels
    /// upstream and terminates the sequence with it.
    pub fn try_filter(
        &self,
        predicate: impl Fn(&T) -> Result<bool, RxError> + Send + Sync + 'static,
    ) -> Self {
        Self::assemble(Filter {
            source: self.clone(),
            predicate: Arc::new(predicate),
        })
    }
}

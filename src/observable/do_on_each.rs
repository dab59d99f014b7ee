//! Side-effect operators: `do_on_next`, `do_on_error`, `do_on_complete`,
//! `do_on_terminate`, `do_after_terminate`.
//!
//! ## Rules
//! - `on_next` callback fails → upstream cancelled, failure sent downstream.
//! - `on_complete` callback fails → the sequence errors instead of completing.
//! - `on_error` callback fails → downstream receives a composite of both errors.
//! - After-terminate callback fails → the failure goes to the plugin hub (downstream is
//!   already terminated).

use std::sync::Arc;

use crate::disposables::DisposableRef;
use crate::error::{CompositeError, RxError};
use crate::observable::stage::Stage;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer};
use crate::plugins::Plugins;

type OnNext<T> = Arc<dyn Fn(&T) -> Result<(), RxError> + Send + Sync>;
type OnError = Arc<dyn Fn(&RxError) -> Result<(), RxError> + Send + Sync>;
type Action = Arc<dyn Fn() -> Result<(), RxError> + Send + Sync>;

struct Callbacks<T> {
    on_next: Option<OnNext<T>>,
    on_error: Option<OnError>,
    on_complete: Option<Action>,
    after_terminate: Option<Action>,
}

impl<T> Clone for Callbacks<T> {
    fn clone(&self) -> Self {
        Self {
            on_next: self.on_next.clone(),
            on_error: self.on_error.clone(),
            on_complete: self.on_complete.clone(),
            after_terminate: self.after_terminate.clone(),
        }
    }
}

impl<T> Callbacks<T> {
    fn none() -> Self {
        Self {
            on_next: None,
            on_error: None,
            on_complete: None,
            after_terminate: None,
        }
    }
}

struct DoOnEach<T> {
    source: Observable<T>,
    callbacks: Callbacks<T>,
}

impl<T: Send + 'static> ObservableSource<T> for DoOnEach<T> {
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        self.source.subscribe(Box::new(DoOnEachObserver {
            stage: Stage::new(observer),
            callbacks: self.callbacks.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "do_on_each"
    }
}

struct DoOnEachObserver<T> {
    stage: Stage<T>,
    callbacks: Callbacks<T>,
}

impl<T> DoOnEachObserver<T> {
    fn after_terminate(&self) {
        if let Some(f) = &self.callbacks.after_terminate {
            if let Err(error) = f() {
                Plugins::global().on_error(error);
            }
        }
    }
}

impl<T: Send> Observer<T> for DoOnEachObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        self.stage.subscribe(d);
    }

    fn on_next(&mut self, value: T) {
        if self.stage.is_done() {
            return;
        }
        if let Some(f) = &self.callbacks.on_next {
            if let Err(error) = f(&value) {
                self.stage.cancel();
                self.on_error(error);
                return;
            }
        }
        self.stage.next(value);
    }

    fn on_error(&mut self, error: RxError) {
        if self.stage.is_done() {
            Plugins::global().on_error(error);
            return;
        }
        let error = match &self.callbacks.on_error {
            Some(f) => match f(&error) {
                Ok(()) => error,
                Err(secondary) => match CompositeError::new([error.clone(), secondary]) {
                    Ok(composite) => RxError::Composite(composite),
                    Err(_) => error,
                },
            },
            None => error,
        };
        self.stage.error(error);
        self.after_terminate();
    }

    fn on_complete(&mut self) {
        if self.stage.is_done() {
            return;
        }
        if let Some(f) = &self.callbacks.on_complete {
            if let Err(error) = f() {
                self.on_error(error);
                return;
            }
        }
        self.stage.complete();
        self.after_terminate();
    }
}

impl<T: Send + 'static> Observable<T> {
    fn do_on_each(&self, callbacks: Callbacks<T>) -> Self {
        Self::assemble(DoOnEach {
            source: self.clone(),
            callbacks,
        })
    }

    /// Runs `f` for every item before it is forwarded.
    pub fn do_on_next(
        &self,
        f: impl Fn(&T) -> Result<(), RxError> + Send + Sync + 'static,
    ) -> Self {
        self.do_on_each(Callbacks {
            on_next: Some(Arc::new(f)),
            ..Callbacks::none()
        })
    }

    /// Runs `f` with the failure before it is forwarded.
    pub fn do_on_error(
        &self,
        f: impl Fn(&RxError) -> Result<(), RxError> + Send + Sync + 'static,
    ) -> Self {
        self.do_on_each(Callbacks {
            on_error: Some(Arc::new(f)),
            ..Callbacks::none()
        })
    }

    /// Runs `f` before completion is forwarded.
    pub fn do_on_complete(
        &self,
        f: impl Fn() -> Result<(), RxError> + Send + Sync + 'static,
    ) -> Self {
        self.do_on_each(Callbacks {
            on_complete: Some(Arc::new(f)),
            ..Callbacks::none()
        })
    }

    /// Runs `f` before either terminal signal is forwarded.
    pub fn do_on_terminate(
        &self,
        f: impl Fn() -> Result<(), RxError> + Send + Sync + 'static,
    ) -> Self {
        let action: Action = Arc::new(f);
        let on_error = Arc::clone(&action);
        self.do_on_each(Callbacks {
            on_error: Some(Arc::new(move |_: &RxError| on_error())),
            on_complete: Some(action),
            ..Callbacks::none()
        })
    }

    /// Runs `f` after either terminal signal was forwarded.
    pub fn do_after_terminate(
        &self,
        f: impl Fn() -> Result<(), RxError> + Send + Sync + 'static,
    ) -> Self {
        self.do_on_each(Callbacks {
            after_terminate: Some(Arc::new(f)),
            ..Callbacks::none()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::Recorder;
    use parking_lot::Mutex;

    #[test]
    fn callbacks_run_in_signal_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
        let rec = Recorder::new();
        Observable::from_iter(vec![1, 2])
            .do_on_next(move |v| {
                a.lock().push(format!("next:{v}"));
                Ok(())
            })
            .do_on_terminate(move || {
                b.lock().push("terminate".to_string());
                Ok(())
            })
            .do_after_terminate(move || {
                c.lock().push("after".to_string());
                Ok(())
            })
            .subscribe(rec.boxed())
            .unwrap();
        assert_eq!(*log.lock(), vec!["next:1", "next:2", "terminate", "after"]);
        assert!(rec.is_completed());
    }

    #[test]
    fn failing_next_callback_cancels_and_errors() {
        let rec = Recorder::<u8>::new();
        Observable::from_iter(vec![1u8, 2, 3])
            .do_on_next(|v| {
                if *v == 2 {
                    Err(RxError::illegal_state("no twos"))
                } else {
                    Ok(())
                }
            })
            .subscribe(rec.boxed())
            .unwrap();
        assert_eq!(rec.values(), vec![1]);
        assert_eq!(rec.error().map(|e| e.kind()), Some(ErrorKind::IllegalState));
        rec.assert_protocol();
    }

    #[test]
    fn failing_complete_callback_turns_into_error() {
        let rec = Recorder::<u8>::new();
        Observable::just(1u8)
            .do_on_complete(|| Err(RxError::illegal_state("cannot finish")))
            .subscribe(rec.boxed())
            .unwrap();
        assert_eq!(rec.values(), vec![1]);
        assert!(!rec.is_completed());
        assert_eq!(rec.error().map(|e| e.kind()), Some(ErrorKind::IllegalState));
    }

    #[test]
    fn failing_error_callback_produces_a_composite() {
        let rec = Recorder::<u8>::new();
        Observable::error(RxError::null("first"))
            .do_on_error(|_| Err(RxError::illegal_state("second")))
            .subscribe(rec.boxed())
            .unwrap();
        match rec.error() {
            Some(RxError::Composite(c)) => assert_eq!(c.len(), 2),
            other => panic!("expected a composite, got {other:?}"),
        }
    }
}

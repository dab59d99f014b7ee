use crate::disposables::DisposableRef;
use crate::error::RxError;

/// Consumer side of a sequence.
///
/// ## Protocol
/// ```text
/// on_subscribe  (exactly once, first)
/// on_next*      (zero or more)
/// on_error | on_complete   (at most one, last)
/// ```
///
/// Calls never overlap: a producer that emits from several threads must serialize first
/// (see [`SerializedObserver`](crate::SerializedObserver)).
pub trait Observer<T>: Send {
    /// Receives the handle that cancels the upstream.
    fn on_subscribe(&mut self, d: DisposableRef);

    /// Receives one item.
    fn on_next(&mut self, value: T);

    /// Receives the terminal failure.
    fn on_error(&mut self, error: RxError);

    /// Receives normal completion.
    fn on_complete(&mut self);
}

/// An owned, type-erased observer.
pub type BoxObserver<T> = Box<dyn Observer<T> + Send>;

impl<T, O> Observer<T> for Box<O>
where
    O: Observer<T> + ?Sized,
{
    fn on_subscribe(&mut self, d: DisposableRef) {
        (**self).on_subscribe(d);
    }

    fn on_next(&mut self, value: T) {
        (**self).on_next(value);
    }

    fn on_error(&mut self, error: RxError) {
        (**self).on_error(error);
    }

    fn on_complete(&mut self) {
        (**self).on_complete();
    }
}

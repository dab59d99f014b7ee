use crate::error::RxError;
use crate::observable::Observable;
use crate::observers::Observer;

/// Both ends of a multicast: an [`Observer`] fed by producers and an [`Observable`] that
/// any number of observers subscribe to.
///
/// Once a terminal signal arrives the subject stays terminated: current observers receive
/// it, and later subscribers receive it immediately.
pub trait Subject<T>: Observer<T> {
    /// Whether at least one observer is currently subscribed.
    fn has_observers(&self) -> bool;

    /// Whether the subject terminated with an error.
    fn has_throwable(&self) -> bool;

    /// Whether the subject completed normally.
    fn has_complete(&self) -> bool;

    /// The terminal error, if the subject terminated with one.
    fn throwable(&self) -> Option<RxError>;

    /// The observable side of the subject.
    fn to_observable(&self) -> Observable<T>;
}

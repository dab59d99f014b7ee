use crate::error::RxError;
use crate::observers::Observer;

/// A signal of an [`Observer`] protocol, reified as a value.
#[derive(Debug, Clone)]
pub enum Notification<T> {
    /// An item.
    Next(T),
    /// Normal completion.
    Complete,
    /// Failure.
    Error(RxError),
}

impl<T> Notification<T> {
    /// Whether this is `Complete` or `Error`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }

    /// Delivers the signal to `observer`. Returns true if it was terminal.
    pub fn accept<O>(self, observer: &mut O) -> bool
    where
        O: Observer<T> + ?Sized,
    {
        match self {
            Notification::Next(v) => {
                observer.on_next(v);
                false
            }
            Notification::Complete => {
                observer.on_complete();
                true
            }
            Notification::Error(e) => {
                observer.on_error(e);
                true
            }
        }
    }

    /// Returns the item of a `Next`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Notification::Next(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the failure of an `Error`.
    pub fn error(&self) -> Option<&RxError> {
        match self {
            Notification::Error(e) => Some(e),
            _ => None,
        }
    }
}

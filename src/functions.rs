//! Small helpers shared by operators: argument checks, no-op callbacks and the
//! missing-error-handler guard.

use std::fmt::Display;
use std::sync::Arc;

use crate::error::RxError;
use crate::plugins::Plugins;

/// Returns the value or an [`RxError::Null`] carrying `message`.
pub fn require_some<T>(value: Option<T>, message: &str) -> Result<T, RxError> {
    value.ok_or_else(|| RxError::null(message))
}

/// Validates that `value` is strictly positive.
///
/// # Example
/// ```
/// use rxvisor::functions::verify_positive;
///
/// assert_eq!(verify_positive(16, "buffer_size").unwrap(), 16);
/// let err = verify_positive(0, "buffer_size").unwrap_err();
/// assert_eq!(err.as_message(), "illegal argument: buffer_size > 0 required but it was 0");
/// ```
pub fn verify_positive<N>(value: N, param: &str) -> Result<N, RxError>
where
    N: PartialOrd + Default + Display + Copy,
{
    if value <= N::default() {
        return Err(RxError::illegal_argument(format!(
            "{param} > 0 required but it was {value}"
        )));
    }
    Ok(value)
}

/// A callback that ignores its argument.
pub fn noop<T>(_: T) {}

/// A callback that does nothing.
pub fn noop_action() {}

/// Error callback installed when a subscriber provides none.
///
/// Wraps the error as [`RxError::OnErrorNotImplemented`] and hands it to the plugin hub so
/// it is never silently discarded.
pub fn on_error_missing(error: RxError) {
    Plugins::global().on_error(RxError::OnErrorNotImplemented {
        cause: Arc::new(error),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn require_some_reports_null() {
        assert_eq!(require_some(Some(3), "x").unwrap(), 3);
        let err = require_some::<u8>(None, "observer is null").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Null);
    }

    #[test]
    fn verify_positive_rejects_zero_and_negatives() {
        assert!(verify_positive(1usize, "n").is_ok());
        assert!(verify_positive(0usize, "n").is_err());
        assert_eq!(
            verify_positive(-4i64, "count").unwrap_err().kind(),
            ErrorKind::IllegalArgument
        );
    }
}

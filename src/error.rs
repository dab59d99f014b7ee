//! Error types used by the rxvisor runtime, operators and schedulers.
//!
//! This module defines:
//!
//! - [`RxError`]: every failure that can travel through a pipeline or reach the plugin hub.
//! - [`ErrorKind`]: the closed classification used to tell likely bugs apart from
//!   ordinary delivery failures.
//! - [`CompositeError`]: several failures collected into one (e.g. by
//!   [`CompositeDisposable`](crate::CompositeDisposable)).
//!
//! ## Fatal vs. non-fatal
//! Non-fatal failures are values: they flow through `Result<_, RxError>` and end up either
//! in a downstream `on_error` or in [`Plugins::on_error`](crate::Plugins::on_error).
//! Panics are the fatal class. Operators and the subscribe handshake never catch them; they
//! unwind to the caller untouched and bypass every hook.
//!
//! ## Bugs vs. undeliverables
//! ```text
//! Null / IllegalArgument / IllegalState / Composite / OnErrorNotImplemented / SchedulerFatal
//!     └─► likely a defect: reaches the error hook as-is
//! everything else
//!     └─► wrapped in RxError::Undeliverable before reaching the error hook
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// # Errors produced by the rxvisor runtime.
///
/// Cloning is cheap: nested causes are shared behind `Arc`.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RxError {
    /// A required value was absent (e.g. a subscribe hook returned no observer).
    #[error("null: {message}")]
    Null {
        /// What was missing.
        message: String,
    },

    /// An argument was out of its valid range.
    #[error("illegal argument: {message}")]
    IllegalArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// A protocol violation, such as setting an upstream disposable twice.
    #[error("illegal state: {message}")]
    IllegalState {
        /// Description of the violated state.
        message: String,
    },

    /// Several failures collected together.
    #[error(transparent)]
    Composite(CompositeError),

    /// A terminal subscribe was made without an error callback and an error arrived.
    #[error("the error handler is not implemented: {cause}")]
    OnErrorNotImplemented {
        /// The error nobody handled.
        cause: Arc<RxError>,
    },

    /// An error that could not be delivered through the normal channel.
    #[error("undeliverable: {cause}")]
    Undeliverable {
        /// The original failure.
        cause: Arc<RxError>,
    },

    /// A scheduled task panicked.
    #[error("fatal exception thrown on scheduler: {message}")]
    SchedulerFatal {
        /// Panic payload rendered as text.
        message: String,
    },

    /// The subscribe handshake failed after callbacks may already have fired.
    #[error("subscribe failed: {cause}")]
    SubscribeFailed {
        /// The failure raised by the operator's subscribe logic.
        cause: Arc<RxError>,
    },

    /// A panic was caught in a containment context (member disposal, plugin hook).
    #[error("panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// An arbitrary user failure.
    #[error(transparent)]
    Custom(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

/// Closed classification of [`RxError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// [`RxError::Null`].
    Null,
    /// [`RxError::IllegalArgument`].
    IllegalArgument,
    /// [`RxError::IllegalState`].
    IllegalState,
    /// [`RxError::Composite`].
    Composite,
    /// [`RxError::OnErrorNotImplemented`].
    OnErrorNotImplemented,
    /// [`RxError::Undeliverable`].
    Undeliverable,
    /// [`RxError::SchedulerFatal`].
    SchedulerFatal,
    /// [`RxError::SubscribeFailed`].
    SubscribeFailed,
    /// [`RxError::Panicked`].
    Panicked,
    /// [`RxError::Custom`].
    Custom,
}

impl RxError {
    /// Builds an [`RxError::Null`].
    pub fn null(message: impl Into<String>) -> Self {
        RxError::Null {
            message: message.into(),
        }
    }

    /// Builds an [`RxError::IllegalArgument`].
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        RxError::IllegalArgument {
            message: message.into(),
        }
    }

    /// Builds an [`RxError::IllegalState`].
    pub fn illegal_state(message: impl Into<String>) -> Self {
        RxError::IllegalState {
            message: message.into(),
        }
    }

    /// Wraps any user error.
    ///
    /// # Example
    /// ```
    /// use rxvisor::{ErrorKind, RxError};
    ///
    /// let err = RxError::custom(std::io::Error::other("disk on fire"));
    /// assert_eq!(err.kind(), ErrorKind::Custom);
    /// assert!(!err.is_bug());
    /// ```
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RxError::Custom(Arc::new(error))
    }

    /// Renders a caught panic payload as [`RxError::Panicked`].
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        RxError::Panicked {
            message: panic_message(payload),
        }
    }

    /// Returns the closed classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RxError::Null { .. } => ErrorKind::Null,
            RxError::IllegalArgument { .. } => ErrorKind::IllegalArgument,
            RxError::IllegalState { .. } => ErrorKind::IllegalState,
            RxError::Composite(_) => ErrorKind::Composite,
            RxError::OnErrorNotImplemented { .. } => ErrorKind::OnErrorNotImplemented,
            RxError::Undeliverable { .. } => ErrorKind::Undeliverable,
            RxError::SchedulerFatal { .. } => ErrorKind::SchedulerFatal,
            RxError::SubscribeFailed { .. } => ErrorKind::SubscribeFailed,
            RxError::Panicked { .. } => ErrorKind::Panicked,
            RxError::Custom(_) => ErrorKind::Custom,
        }
    }

    /// Indicates whether the error most likely comes from a defect rather than from a
    /// sequence that simply had nobody left to deliver to.
    ///
    /// Bugs reach the error hook unwrapped; everything else gets wrapped in
    /// [`RxError::Undeliverable`].
    ///
    /// # Example
    /// ```
    /// use rxvisor::RxError;
    ///
    /// assert!(RxError::null("observer").is_bug());
    /// assert!(!RxError::Panicked { message: "boom".into() }.is_bug());
    /// ```
    pub fn is_bug(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Null
                | ErrorKind::IllegalArgument
                | ErrorKind::IllegalState
                | ErrorKind::Composite
                | ErrorKind::OnErrorNotImplemented
                | ErrorKind::SchedulerFatal
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rxvisor::RxError;
    ///
    /// let err = RxError::illegal_argument("buffer_size > 0 required but it was 0");
    /// assert_eq!(err.as_label(), "rx_illegal_argument");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Null => "rx_null",
            ErrorKind::IllegalArgument => "rx_illegal_argument",
            ErrorKind::IllegalState => "rx_illegal_state",
            ErrorKind::Composite => "rx_composite",
            ErrorKind::OnErrorNotImplemented => "rx_on_error_not_implemented",
            ErrorKind::Undeliverable => "rx_undeliverable",
            ErrorKind::SchedulerFatal => "rx_scheduler_fatal",
            ErrorKind::SubscribeFailed => "rx_subscribe_failed",
            ErrorKind::Panicked => "rx_panicked",
            ErrorKind::Custom => "rx_custom",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RxError::Null { message } => format!("null: {message}"),
            RxError::IllegalArgument { message } => format!("illegal argument: {message}"),
            RxError::IllegalState { message } => format!("illegal state: {message}"),
            RxError::Composite(c) => c.to_string(),
            RxError::OnErrorNotImplemented { cause } => {
                format!("missing error handler; cause={}", cause.as_message())
            }
            RxError::Undeliverable { cause } => {
                format!("undeliverable; cause={}", cause.as_message())
            }
            RxError::SchedulerFatal { message } => format!("scheduler task panicked: {message}"),
            RxError::SubscribeFailed { cause } => {
                format!("subscribe failed; cause={}", cause.as_message())
            }
            RxError::Panicked { message } => format!("panicked: {message}"),
            RxError::Custom(e) => format!("error: {e}"),
        }
    }

    /// Returns the wrapped cause for envelope variants.
    pub fn cause(&self) -> Option<&RxError> {
        match self {
            RxError::OnErrorNotImplemented { cause }
            | RxError::Undeliverable { cause }
            | RxError::SubscribeFailed { cause } => Some(cause),
            _ => None,
        }
    }

    /// Address of the shared allocation backing this error, if any.
    ///
    /// Two errors with the same identity are clones of the same failure.
    fn identity(&self) -> Option<usize> {
        match self {
            RxError::Custom(e) => Some(Arc::as_ptr(e) as *const () as usize),
            RxError::OnErrorNotImplemented { cause }
            | RxError::Undeliverable { cause }
            | RxError::SubscribeFailed { cause } => Some(Arc::as_ptr(cause) as usize),
            _ => None,
        }
    }
}

/// Several failures collected together.
///
/// Nested composites are flattened and clones of the same failure appear once, so every
/// original member stays visible without duplication.
#[derive(Debug, Clone)]
pub struct CompositeError {
    errors: Arc<Vec<RxError>>,
}

impl CompositeError {
    /// Collects `errors` into one composite.
    ///
    /// Returns [`RxError::IllegalArgument`] if `errors` is empty.
    ///
    /// # Example
    /// ```
    /// use rxvisor::{CompositeError, RxError};
    ///
    /// let inner = CompositeError::new(vec![RxError::null("a"), RxError::null("b")]).unwrap();
    /// let outer = CompositeError::new(vec![
    ///     RxError::Composite(inner),
    ///     RxError::illegal_state("c"),
    /// ])
    /// .unwrap();
    /// assert_eq!(outer.len(), 3);
    /// ```
    pub fn new(errors: impl IntoIterator<Item = RxError>) -> Result<Self, RxError> {
        let mut seen = HashSet::new();
        let mut flat = Vec::new();
        for error in errors {
            match error {
                RxError::Composite(inner) => {
                    for nested in inner.errors.iter() {
                        push_unique(&mut flat, &mut seen, nested.clone());
                    }
                }
                other => push_unique(&mut flat, &mut seen, other),
            }
        }
        if flat.is_empty() {
            return Err(RxError::illegal_argument("errors is empty"));
        }
        Ok(Self {
            errors: Arc::new(flat),
        })
    }

    /// All collected failures in arrival order.
    pub fn errors(&self) -> &[RxError] {
        &self.errors
    }

    /// Number of collected failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false: an empty composite cannot be built.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

fn push_unique(flat: &mut Vec<RxError>, seen: &mut HashSet<usize>, error: RxError) {
    if let Some(id) = error.identity() {
        if !seen.insert(id) {
            return;
        }
    }
    flat.push(error);
}

impl fmt::Display for CompositeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} exceptions occurred.", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            write!(f, " [{i}] {e};")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeError {}

/// Merges several errors: none → `None`, one → itself, more → [`RxError::Composite`].
pub(crate) fn collapse(mut errors: Vec<RxError>) -> Option<RxError> {
    match errors.len() {
        0 => None,
        1 => errors.pop(),
        _ => Some(match CompositeError::new(errors) {
            Ok(c) => RxError::Composite(c),
            Err(e) => e,
        }),
    }
}

/// Best-effort rendering of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! # The `Disposable` contract and its simplest implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// One-way, idempotent, thread-safe cancellation token.
///
/// # Example
/// ```
/// use rxvisor::{BooleanDisposable, Disposable};
///
/// let d = BooleanDisposable::new();
/// assert!(!d.is_disposed());
/// d.dispose();
/// d.dispose(); // no-op
/// assert!(d.is_disposed());
/// ```
pub trait Disposable: Send + Sync + 'static {
    /// Transitions to the disposed state. Calling it again has no effect.
    fn dispose(&self);

    /// Returns true once [`dispose`](Disposable::dispose) has been called.
    fn is_disposed(&self) -> bool;
}

/// Shared handle to a disposable.
pub type DisposableRef = Arc<dyn Disposable>;

/// A disposable that only records whether it was disposed.
#[derive(Debug, Default)]
pub struct BooleanDisposable {
    disposed: AtomicBool,
}

impl BooleanDisposable {
    /// Creates an active disposable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an active disposable behind a [`DisposableRef`].
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Disposable for BooleanDisposable {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Runs an action exactly once, on the first [`dispose`](Disposable::dispose).
pub struct ActionDisposable {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    disposed: AtomicBool,
}

impl ActionDisposable {
    /// Creates a disposable that runs `action` when disposed.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
            disposed: AtomicBool::new(false),
        }
    }
}

impl Disposable for ActionDisposable {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ActionDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDisposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Disposable for CancellationToken {
    fn dispose(&self) {
        self.cancel();
    }

    fn is_disposed(&self) -> bool {
        self.is_cancelled()
    }
}

/// Returns a disposable that is already disposed.
pub fn disposed() -> DisposableRef {
    let d = BooleanDisposable::new();
    d.dispose();
    Arc::new(d)
}

/// Returns a fresh, active disposable with no associated resource.
pub fn empty() -> DisposableRef {
    BooleanDisposable::arc()
}

/// Returns a disposable that runs `action` once when disposed.
pub fn from_fn(action: impl FnOnce() + Send + 'static) -> DisposableRef {
    Arc::new(ActionDisposable::new(action))
}

//! # Container of many disposables.
//!
//! [`CompositeDisposable`] tracks disposables by identity (the `Arc` address), so add,
//! remove, delete and contains are O(1).
//!
//! ## Architecture
//! ```text
//!   add(d) ──► lock ─► disposed? ──yes──► unlock ─► d.dispose(), false
//!                         │ no
//!                         └─► insert ─► unlock, true
//!
//!   dispose() ──► lock ─► take the whole set ─► unlock
//!                                  │
//!                                  └─► dispose every member (panics caught one by one)
//!                                          └─► 0 failures: Ok
//!                                              1 failure : that error
//!                                              n failures: RxError::Composite
//! ```
//!
//! ## Rules
//! - Members are disposed outside the lock.
//! - Every member is disposed even if an earlier one panics.
//! - After dispose the composite is empty and stays empty.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{Disposable, DisposableRef};
use crate::error::{RxError, collapse};
use crate::plugins::Plugins;

type Members = HashMap<usize, DisposableRef>;

/// Identity-keyed set of disposables, disposed together.
///
/// # Example
/// ```
/// use rxvisor::{BooleanDisposable, CompositeDisposable, Disposable};
///
/// let set = CompositeDisposable::new();
/// let a = BooleanDisposable::arc();
/// assert!(set.add(a.clone()));
/// assert_eq!(set.size(), 1);
///
/// set.dispose();
/// assert!(a.is_disposed());
/// assert_eq!(set.size(), 0);
///
/// let late = BooleanDisposable::arc();
/// assert!(!set.add(late.clone()));
/// assert!(late.is_disposed());
/// ```
#[derive(Default)]
pub struct CompositeDisposable {
    disposed: AtomicBool,
    members: Mutex<Option<Members>>,
}

#[inline]
fn key(d: &DisposableRef) -> usize {
    Arc::as_ptr(d) as *const () as usize
}

impl CompositeDisposable {
    /// Creates an empty, active composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a composite pre-filled with `items`.
    pub fn with(items: impl IntoIterator<Item = DisposableRef>) -> Self {
        let members: Members = items.into_iter().map(|d| (key(&d), d)).collect();
        Self {
            disposed: AtomicBool::new(false),
            members: Mutex::new(Some(members)),
        }
    }

    /// Adds `d`. On a disposed composite `d` is disposed immediately and false is returned.
    pub fn add(&self, d: DisposableRef) -> bool {
        if !self.disposed.load(Ordering::Acquire) {
            let mut guard = self.members.lock();
            if !self.disposed.load(Ordering::Relaxed) {
                guard.get_or_insert_with(HashMap::new).insert(key(&d), d);
                return true;
            }
        }
        d.dispose();
        false
    }

    /// Adds every item; all of them are disposed if the composite is already disposed.
    pub fn add_all(&self, items: impl IntoIterator<Item = DisposableRef>) -> bool {
        let items: Vec<DisposableRef> = items.into_iter().collect();
        if !self.disposed.load(Ordering::Acquire) {
            let mut guard = self.members.lock();
            if !self.disposed.load(Ordering::Relaxed) {
                let set = guard.get_or_insert_with(HashMap::new);
                for d in items {
                    set.insert(key(&d), d);
                }
                return true;
            }
        }
        for d in items {
            d.dispose();
        }
        false
    }

    /// Stops tracking `d` and disposes it. Returns false if `d` was not a member.
    pub fn remove(&self, d: &DisposableRef) -> bool {
        if self.delete(d) {
            d.dispose();
            return true;
        }
        false
    }

    /// Stops tracking `d` without disposing it.
    pub fn delete(&self, d: &DisposableRef) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }
        let mut guard = self.members.lock();
        if self.disposed.load(Ordering::Relaxed) {
            return false;
        }
        guard
            .as_mut()
            .is_some_and(|set| set.remove(&key(d)).is_some())
    }

    /// Whether `d` is currently tracked.
    pub fn contains(&self, d: &DisposableRef) -> bool {
        self.members
            .lock()
            .as_ref()
            .is_some_and(|set| set.contains_key(&key(d)))
    }

    /// Number of tracked members; 0 once disposed.
    pub fn size(&self) -> usize {
        if self.disposed.load(Ordering::Acquire) {
            return 0;
        }
        self.members.lock().as_ref().map_or(0, HashMap::len)
    }

    /// Disposes the current members but leaves the composite usable.
    pub fn clear(&self) -> Result<(), RxError> {
        if self.disposed.load(Ordering::Acquire) {
            return Ok(());
        }
        let taken = {
            let mut guard = self.members.lock();
            if self.disposed.load(Ordering::Relaxed) {
                return Ok(());
            }
            guard.as_mut().map(std::mem::take)
        };
        dispose_all(taken)
    }

    /// Disposes the composite and every member, returning the collected failures.
    ///
    /// Calling it again is a no-op returning `Ok(())`.
    pub fn try_dispose(&self) -> Result<(), RxError> {
        if self.disposed.load(Ordering::Acquire) {
            return Ok(());
        }
        let taken = {
            let mut guard = self.members.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            guard.take()
        };
        dispose_all(taken)
    }
}

fn dispose_all(members: Option<Members>) -> Result<(), RxError> {
    let Some(members) = members else {
        return Ok(());
    };
    let mut failures = Vec::new();
    for (_, d) in members {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| d.dispose())) {
            failures.push(RxError::from_panic(payload.as_ref()));
        }
    }
    match collapse(failures) {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

impl Disposable for CompositeDisposable {
    fn dispose(&self) {
        if let Err(err) = self.try_dispose() {
            Plugins::global().on_error(err);
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CompositeDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeDisposable")
            .field("disposed", &self.is_disposed())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposables::{BooleanDisposable, from_fn};
    use crate::error::ErrorKind;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(hits: &Arc<AtomicUsize>) -> DisposableRef {
        let hits = hits.clone();
        from_fn(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn panicking(msg: &'static str) -> DisposableRef {
        from_fn(move || panic!("{msg}"))
    }

    #[test]
    fn delete_does_not_dispose_remove_does() {
        let set = CompositeDisposable::new();
        let a: DisposableRef = BooleanDisposable::arc();
        let b: DisposableRef = BooleanDisposable::arc();
        set.add(a.clone());
        set.add(b.clone());

        assert!(set.delete(&a));
        assert!(!a.is_disposed());
        assert!(!set.contains(&a));

        assert!(set.remove(&b));
        assert!(b.is_disposed());
        assert_eq!(set.size(), 0);
        assert!(!set.remove(&b));
    }

    #[test]
    fn single_failure_is_returned_as_is() {
        let hits = Arc::new(AtomicUsize::new(0));
        let set = CompositeDisposable::with([counting(&hits), panicking("boom")]);
        let err = set.try_dispose().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Panicked);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn several_failures_become_a_composite() {
        let hits = Arc::new(AtomicUsize::new(0));
        let set = CompositeDisposable::new();
        set.add(panicking("one"));
        set.add(counting(&hits));
        set.add(panicking("two"));
        set.add(counting(&hits));

        match set.try_dispose() {
            Err(RxError::Composite(c)) => assert_eq!(c.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(set.try_dispose().is_ok());
    }

    #[test]
    fn clear_keeps_the_composite_usable() {
        let set = CompositeDisposable::new();
        let a: DisposableRef = BooleanDisposable::arc();
        set.add(a.clone());
        set.clear().unwrap();
        assert!(a.is_disposed());
        assert!(!set.is_disposed());

        let b: DisposableRef = BooleanDisposable::arc();
        assert!(set.add(b.clone()));
        assert!(!b.is_disposed());
        assert_eq!(set.size(), 1);
    }

    proptest! {
        #[test]
        fn every_member_is_disposed_exactly_once(healthy in 0usize..24, failing in 0usize..6) {
            let hits = Arc::new(AtomicUsize::new(0));
            let set = CompositeDisposable::new();
            for _ in 0..healthy {
                prop_assert!(set.add(counting(&hits)));
            }
            for _ in 0..failing {
                prop_assert!(set.add(panicking("member failed")));
            }

            let result = set.try_dispose();
            set.dispose();

            prop_assert_eq!(hits.load(Ordering::SeqCst), healthy);
            prop_assert_eq!(result.is_err(), failing > 0);
            prop_assert_eq!(set.size(), 0);

            let late = BooleanDisposable::arc();
            prop_assert!(!set.add(late.clone()));
            prop_assert!(late.is_disposed());
        }
    }
}

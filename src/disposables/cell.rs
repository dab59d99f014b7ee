//! # Single-slot disposable cell.
//!
//! [`DisposableCell`] holds at most one [`Disposable`] and supports the three swaps
//! operators need when a resource is replaced over time (a timer per item, an upstream set
//! once, a task swapped per tick):
//!
//! ```text
//!            set / replace / set_once
//!   Empty ─────────────────────────────► Holding(d)
//!     │                                     │ set(d2): dispose d, hold d2
//!     │                                     │ replace(d2): hold d2, d untouched
//!     │ dispose                             │ dispose: dispose d
//!     ▼                                     ▼
//!   Disposed ◄──────────────────────────────┘
//!     (terminal: anything offered afterwards is disposed immediately)
//! ```
//!
//! Transitions are compare-and-swap loops over an [`ArcSwap`]; the displaced disposable is
//! always disposed after the swap, never during it.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{Disposable, DisposableRef};
use crate::error::RxError;
use crate::plugins::Plugins;

enum Slot {
    Empty,
    Holding(DisposableRef),
    Disposed,
}

/// Atomic single-slot holder of a [`DisposableRef`].
pub struct DisposableCell {
    slot: ArcSwap<Slot>,
}

impl DisposableCell {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            slot: ArcSwap::from_pointee(Slot::Empty),
        }
    }

    /// Creates a cell already holding `d`.
    pub fn with(d: DisposableRef) -> Self {
        Self {
            slot: ArcSwap::from_pointee(Slot::Holding(d)),
        }
    }

    /// Returns the currently held disposable, if any.
    pub fn get(&self) -> Option<DisposableRef> {
        match &**self.slot.load() {
            Slot::Holding(d) => Some(Arc::clone(d)),
            _ => None,
        }
    }

    /// Installs `next` and disposes the previous occupant.
    ///
    /// Returns false (and disposes `next`) if the cell was already disposed.
    pub fn set(&self, next: DisposableRef) -> bool {
        match self.install(&next) {
            Some(prev) => {
                if let Some(prev) = prev {
                    prev.dispose();
                }
                true
            }
            None => {
                next.dispose();
                false
            }
        }
    }

    /// Installs `next` without disposing the previous occupant.
    ///
    /// Returns false (and disposes `next`) if the cell was already disposed.
    pub fn replace(&self, next: DisposableRef) -> bool {
        match self.install(&next) {
            Some(_) => true,
            None => {
                next.dispose();
                false
            }
        }
    }

    /// Installs `next` only if the cell is still empty.
    ///
    /// - cell empty → `next` installed, returns true
    /// - cell disposed → `next` disposed, returns false
    /// - cell occupied → `next` disposed, a protocol violation is reported to the plugin
    ///   hub, returns false
    pub fn set_once(&self, next: DisposableRef) -> bool {
        let new = Arc::new(Slot::Holding(Arc::clone(&next)));
        loop {
            let current = self.slot.load_full();
            match &*current {
                Slot::Empty => {
                    let prev = self.slot.compare_and_swap(&current, Arc::clone(&new));
                    if Arc::ptr_eq(&*prev, &current) {
                        return true;
                    }
                }
                Slot::Holding(_) => {
                    next.dispose();
                    Plugins::global().on_error(RxError::illegal_state("Disposable already set!"));
                    return false;
                }
                Slot::Disposed => {
                    next.dispose();
                    return false;
                }
            }
        }
    }

    /// Disposes the occupant (if any) and moves the cell to its terminal state.
    pub fn dispose(&self) {
        let prev = self.slot.swap(Arc::new(Slot::Disposed));
        if let Slot::Holding(d) = &*prev {
            d.dispose();
        }
    }

    /// Returns true once the cell reached its terminal state.
    pub fn is_disposed(&self) -> bool {
        matches!(**self.slot.load(), Slot::Disposed)
    }

    /// CAS-installs `next`. `None` means the cell is disposed; `Some(prev)` carries the
    /// displaced occupant.
    fn install(&self, next: &DisposableRef) -> Option<Option<DisposableRef>> {
        let new = Arc::new(Slot::Holding(Arc::clone(next)));
        loop {
            let current = self.slot.load_full();
            if matches!(*current, Slot::Disposed) {
                return None;
            }
            let prev = self.slot.compare_and_swap(&current, Arc::clone(&new));
            if Arc::ptr_eq(&*prev, &current) {
                return Some(match &*current {
                    Slot::Holding(d) => Some(Arc::clone(d)),
                    _ => None,
                });
            }
        }
    }
}

impl Default for DisposableCell {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for DisposableCell {
    fn dispose(&self) {
        DisposableCell::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        DisposableCell::is_disposed(self)
    }
}

impl std::fmt::Debug for DisposableCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &**self.slot.load() {
            Slot::Empty => "empty",
            Slot::Holding(_) => "holding",
            Slot::Disposed => "disposed",
        };
        f.debug_struct("DisposableCell").field("state", &state).finish()
    }
}

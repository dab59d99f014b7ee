//! # Cancellation tokens and resource containers.
//!
//! Every subscription hands its observer a [`Disposable`]; disposing it stops delivery at
//! that point of the chain and releases whatever the operator holds upstream (upstream
//! disposables, scheduler workers, timers).
//!
//! ## Contents
//! - [`Disposable`] / [`DisposableRef`] the one-way cancellation contract
//! - [`BooleanDisposable`], [`ActionDisposable`] simple building blocks
//! - [`DisposableCell`] single-slot "cancel previous, install next" cell
//! - [`CompositeDisposable`] O(1) container of many disposables
//!
//! ## Rules
//! - `active → disposed` is one-way and idempotent.
//! - Disposing never blocks on user code while holding an internal lock.

mod cell;
mod composite;
mod disposable;

pub use cell::DisposableCell;
pub use composite::CompositeDisposable;
pub use disposable::{
    ActionDisposable, BooleanDisposable, Disposable, DisposableRef, disposed, empty, from_fn,
};

//! # Observers: the consuming end of a sequence.
//!
//! ## Architecture
//! ```text
//! source ──► operator observer ──► ... ──► final observer
//!                                             ├── LambdaObserver   (callbacks, via SubscriberBuilder)
//!                                             ├── LogObserver      (feature "logging")
//!                                             └── your own impl Observer<T>
//! ```
//!
//! Operators whose signals come from several threads (timers, schedulers) wrap their
//! downstream in a [`SerializedObserver`].

mod lambda;
#[cfg(feature = "logging")]
mod log;
mod observer;
mod serialized;

pub use lambda::{LambdaObserver, SubscriberBuilder};
#[cfg(feature = "logging")]
pub use log::LogObserver;
pub use observer::{BoxObserver, Observer};
pub use serialized::SerializedObserver;

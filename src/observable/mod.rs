//! # Observables: assembly-time descriptions of push-based sequences.
//!
//! An [`Observable`] is an immutable handle to one [`ObservableSource`]. Every fluent
//! operator wraps the current handle in a new source and passes the result through the
//! assembly hook; nothing runs until `subscribe`.
//!
//! ## Operators
//! | Group        | Members                                                        |
//! |--------------|----------------------------------------------------------------|
//! | factories    | `create`, `empty`, `just`, `from_iter`, `error`, `interval`    |
//! | transforms   | `map`, `try_map`, `filter`, `try_filter`                       |
//! | side effects | `do_on_next`, `do_on_error`, `do_on_complete`, `do_on_terminate`, `do_after_terminate` |
//! | threading    | `subscribe_on`, `observe_on`, `observe_on_with`, `delay`       |
//! | timing       | `debounce`, `throttle_first`                                   |
//! | bridges      | `into_stream`, `to`                                            |

mod create;
mod debounce;
mod delay;
mod do_on_each;
mod filter;
mod interval;
mod map;
mod observe_on;
mod source;
mod sources;
mod stage;
mod stream;
mod subscribe_on;
mod throttle_first;

pub use create::Emitter;
pub use source::{Observable, ObservableSource};
pub use stream::RxStream;

//! # Signals as values.
//!
//! - [`Notification`] reifies `on_next`/`on_error`/`on_complete` so they can be queued.
//! - [`AppendOnlyList`] is the chunked, append-only queue the serializing adapter drains.

mod append_only;
mod envelope;

pub use append_only::AppendOnlyList;
pub use envelope::Notification;

//! # LogObserver: a signal printer.
//!
//! Logs every signal it receives through `tracing`. Use it for demos and debugging.
//!
//! ## Example output
//! ```text
//! INFO rxvisor::log: [subscribe] name="clicks"
//! INFO rxvisor::log: [next] name="clicks" value=0
//! INFO rxvisor::log: [next] name="clicks" value=1100
//! INFO rxvisor::log: [complete] name="clicks"
//! WARN rxvisor::log: [error] name="clicks" label="rx_custom" err=...
//! ```

use std::fmt::Debug;

use crate::disposables::DisposableRef;
use crate::error::RxError;
use crate::observers::Observer;

/// Observer that logs every signal.
#[derive(Debug, Clone)]
pub struct LogObserver {
    name: &'static str,
}

impl LogObserver {
    /// Creates a logger tagging every line with `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new("observable")
    }
}

impl<T: Debug> Observer<T> for LogObserver {
    fn on_subscribe(&mut self, _d: DisposableRef) {
        tracing::info!(target: "rxvisor::log", name = self.name, "[subscribe]");
    }

    fn on_next(&mut self, value: T) {
        tracing::info!(target: "rxvisor::log", name = self.name, value = ?value, "[next]");
    }

    fn on_error(&mut self, error: RxError) {
        tracing::warn!(
            target: "rxvisor::log",
            name = self.name,
            label = error.as_label(),
            err = %error,
            "[error]"
        );
    }

    fn on_complete(&mut self) {
        tracing::info!(target: "rxvisor::log", name = self.name, "[complete]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observable;

    #[test]
    fn logs_a_whole_sequence_without_disturbing_it() {
        Observable::from_iter(vec![1, 2, 3])
            .subscribe_with(LogObserver::new("numbers"))
            .unwrap();
        Observable::<u8>::error(RxError::null("gone"))
            .subscribe_with(LogObserver::default())
            .unwrap();
    }
}

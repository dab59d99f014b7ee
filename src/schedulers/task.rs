//! # A cancellable task bound to its worker.
//!
//! [`ScheduledTask`] owns the runnable until it runs. Its token is a child of the owning
//! worker's token, so disposing the worker cancels every pending task in one step.
//!
//! ## Panic handling
//! ```text
//! run()
//!   ├─ cancelled? ─► skip
//!   └─ catch_unwind(task)
//!         ├─ ok    ─► done
//!         └─ panic ─► RxError::SchedulerFatal ─► Plugins::on_error + tracing::error!
//!                         └─► resume_unwind on the executing thread
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::Runnable;
use crate::disposables::Disposable;
use crate::error::{RxError, panic_message};
use crate::plugins::Plugins;

/// A one-shot task that can be cancelled before it starts.
pub struct ScheduledTask {
    task: Mutex<Option<Runnable>>,
    token: CancellationToken,
}

impl ScheduledTask {
    pub(crate) fn new(task: Runnable, token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            task: Mutex::new(Some(task)),
            token,
        })
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Runs the task unless it was cancelled or already ran.
    pub(crate) fn run(&self) {
        if self.token.is_cancelled() {
            return;
        }
        let task = self.task.lock().take();
        let Some(task) = task else {
            return;
        };
        let outcome = catch_unwind(AssertUnwindSafe(task));
        self.token.cancel();
        if let Err(payload) = outcome {
            let err = RxError::SchedulerFatal {
                message: panic_message(payload.as_ref()),
            };
            tracing::error!(label = err.as_label(), error = %err, "scheduled task panicked");
            Plugins::global().on_error(err);
            resume_unwind(payload);
        }
    }
}

impl Disposable for ScheduledTask {
    fn dispose(&self) {
        self.token.cancel();
        drop(self.task.lock().take());
    }

    fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::with_global_errors;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cancelled_task_never_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let task = ScheduledTask::new(
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
            CancellationToken::new(),
        );
        task.dispose();
        task.run();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn parent_token_cancels_children() {
        let worker = CancellationToken::new();
        let task = ScheduledTask::new(Box::new(|| {}), worker.child_token());
        worker.cancel();
        assert!(task.is_disposed());
    }

    #[test]
    fn panic_is_reported_then_reraised() {
        with_global_errors(|seen| {
            let task = ScheduledTask::new(
                Box::new(|| panic!("tick failed at 0x2a")),
                CancellationToken::new(),
            );
            let outcome = catch_unwind(AssertUnwindSafe(|| task.run()));
            let payload = outcome.unwrap_err();
            assert_eq!(panic_message(payload.as_ref()), "tick failed at 0x2a");
            assert!(task.is_disposed());

            let reported: Vec<_> = seen
                .lock()
                .iter()
                .filter(|e| e.to_string().contains("tick failed at 0x2a"))
                .map(RxError::kind)
                .collect();
            assert_eq!(reported, vec![ErrorKind::SchedulerFatal]);
        });
    }
}

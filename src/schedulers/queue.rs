//! # Deadline-ordered task queue drained by one async loop.
//!
//! ## Architecture
//! ```text
//! schedule(task, delay)
//!     │  (deadline = now + delay, seq++)
//!     ▼
//! [unbounded mpsc] ──► drain loop ──► min-heap by (deadline, seq)
//!                          │
//!                          ├─ sleep until the earliest deadline
//!                          └─ run every due entry in order
//!                               ├─ Inline:   on the drain task itself
//!                               └─ Blocking: on the blocking pool, awaited one by one
//! ```
//!
//! ## Rules
//! - One drain loop per queue, so tasks never overlap.
//! - Equal deadlines run in submission order.
//! - The loop holds a drop guard of the owner's token: if a task panic unwinds the loop,
//!   the owner is disposed with it.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::panic::resume_unwind;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::ScheduledTask;

/// How queued tasks are executed by the drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// On the async worker thread that runs the drain loop.
    Inline,
    /// On the runtime's blocking pool (for tasks that block).
    Blocking,
}

pub(crate) struct Entry {
    deadline: Instant,
    seq: u64,
    task: Arc<ScheduledTask>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Producer side of a drain loop.
pub(crate) struct TaskQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<Entry>>>,
    seq: AtomicU64,
}

impl TaskQueue {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Entry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            tx: Mutex::new(Some(tx)),
            seq: AtomicU64::new(0),
        };
        (queue, rx)
    }

    /// Enqueues `task` to run after `delay`. Returns false once the queue is closed.
    pub(crate) fn push(&self, task: Arc<ScheduledTask>, delay: Duration) -> bool {
        let entry = Entry {
            deadline: Instant::now() + delay,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            task,
        };
        match self.tx.lock().as_ref() {
            Some(tx) => tx.send(entry).is_ok(),
            None => false,
        }
    }

    /// Stops accepting tasks; the drain loop exits once it notices.
    pub(crate) fn close(&self) {
        drop(self.tx.lock().take());
    }
}

/// Runs queued tasks until `token` is cancelled or every sender is gone.
pub(crate) async fn drain(
    mut rx: mpsc::UnboundedReceiver<Entry>,
    token: CancellationToken,
    mode: DrainMode,
) {
    let _guard = token.clone().drop_guard();
    let mut pending: BinaryHeap<Reverse<Entry>> = BinaryHeap::new();

    loop {
        let next_deadline = pending.peek().map(|Reverse(e)| e.deadline);
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(entry) => pending.push(Reverse(entry)),
                None => break,
            },
            _ = sleep_until(next_deadline) => {}
        }

        let now = Instant::now();
        while pending.peek().is_some_and(|Reverse(e)| e.deadline <= now) {
            if token.is_cancelled() {
                return;
            }
            if let Some(Reverse(entry)) = pending.pop() {
                run(entry.task, mode).await;
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

pub(crate) async fn run(task: Arc<ScheduledTask>, mode: DrainMode) {
    match mode {
        DrainMode::Inline => task.run(),
        DrainMode::Blocking => {
            if let Err(err) = tokio::task::spawn_blocking(move || task.run()).await {
                if err.is_panic() {
                    resume_unwind(err.into_panic());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(log: &Arc<Mutex<Vec<u32>>>, v: u32) -> Arc<ScheduledTask> {
        let log = Arc::clone(log);
        ScheduledTask::new(
            Box::new(move || log.lock().push(v)),
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn runs_by_deadline_then_submission_order() {
        let (queue, rx) = TaskQueue::new();
        let token = CancellationToken::new();
        let loop_handle = tokio::spawn(drain(rx, token.clone(), DrainMode::Inline));
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.push(recording(&log, 3), Duration::from_millis(20));
        queue.push(recording(&log, 1), Duration::ZERO);
        queue.push(recording(&log, 2), Duration::ZERO);
        queue.push(recording(&log, 4), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*log.lock(), vec![1, 2, 3, 4]);

        queue.close();
        loop_handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_pending_work() {
        let (queue, rx) = TaskQueue::new();
        let token = CancellationToken::new();
        let loop_handle = tokio::spawn(drain(rx, token.clone(), DrainMode::Blocking));
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.push(recording(&log, 1), Duration::from_millis(100));
        token.cancel();
        loop_handle.await.unwrap();
        assert!(log.lock().is_empty());
        assert!(!queue.push(recording(&log, 2), Duration::ZERO));
    }
}

//! # A dedicated host thread.
//!
//! [`LoopThread`] is a concrete [`Looper`]: one OS thread running a single-threaded tokio
//! runtime that drains a deadline-ordered queue. It gives the host scheduler a real thread
//! to post to without any UI toolkit.
//!
//! ```text
//! post_delayed(task, d) ──► [TaskQueue] ──► loop thread: drain (Inline)
//!        │                                     └─ runs tasks one at a time
//!        └─► id ──► CancellationToken (remove_callbacks cancels it)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::queue::{DrainMode, TaskQueue, drain};
use super::{Looper, PostId, Runnable, ScheduledTask};
use crate::error::RxError;

/// A single host thread with a delayed-task queue.
pub struct LoopThread {
    inner: Arc<Inner>,
    thread: Option<JoinHandle<()>>,
}

struct Inner {
    queue: TaskQueue,
    token: CancellationToken,
    thread_id: ThreadId,
    next_id: AtomicU64,
    posts: Mutex<HashMap<PostId, CancellationToken>>,
}

impl LoopThread {
    /// Starts a loop thread named `name`.
    pub fn start(name: &str) -> Result<Self, RxError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| RxError::illegal_state(format!("loop runtime: {e}")))?;
        let (queue, rx) = TaskQueue::new();
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let thread = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || runtime.block_on(drain(rx, loop_token, DrainMode::Inline)))
            .map_err(|e| RxError::illegal_state(format!("loop thread: {e}")))?;
        tracing::debug!(thread = name, "loop thread started");

        Ok(Self {
            inner: Arc::new(Inner {
                queue,
                token,
                thread_id: thread.thread().id(),
                next_id: AtomicU64::new(0),
                posts: Mutex::new(HashMap::new()),
            }),
            thread: Some(thread),
        })
    }

    /// A shareable [`Looper`] view of this thread.
    pub fn looper(&self) -> Arc<dyn Looper> {
        Arc::new(LoopHandle(Arc::clone(&self.inner)))
    }

    /// Stops the loop; pending callbacks are dropped.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.inner.token.cancel();
        self.inner.queue.close();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != std::thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for LoopThread {
    fn drop(&mut self) {
        self.stop();
    }
}

struct LoopHandle(Arc<Inner>);

impl Looper for LoopHandle {
    fn post_delayed(&self, task: Runnable, delay: Duration) -> PostId {
        let inner = &self.0;
        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        let token = inner.token.child_token();
        inner.posts.lock().insert(id, token.clone());

        let owner = Arc::clone(inner);
        let scheduled = ScheduledTask::new(
            Box::new(move || {
                owner.posts.lock().remove(&id);
                task();
            }),
            token,
        );
        if !inner.queue.push(scheduled, delay) {
            inner.posts.lock().remove(&id);
        }
        id
    }

    fn remove_callbacks(&self, id: PostId) {
        if let Some(token) = self.0.posts.lock().remove(&id) {
            token.cancel();
        }
    }

    fn is_current_thread(&self) -> bool {
        std::thread::current().id() == self.0.thread_id
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedulers::{HostScheduler, Scheduler};
    use std::sync::mpsc;

    #[test]
    fn tasks_run_on_the_loop_thread_in_order() {
        let thread = LoopThread::start("rx-host-test").unwrap();
        let looper = thread.looper();
        let (tx, rx) = mpsc::channel();
        for v in 0..3 {
            let tx = tx.clone();
            let probe = thread.looper();
            looper.post_delayed(
                Box::new(move || {
                    let _ = tx.send((v, probe.is_current_thread()));
                }),
                Duration::ZERO,
            );
        }
        let got: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(got, vec![(0, true), (1, true), (2, true)]);
        assert!(!looper.is_current_thread());
        thread.shutdown();
    }

    #[test]
    fn removed_callbacks_never_run() {
        let thread = LoopThread::start("rx-host-remove").unwrap();
        let looper = thread.looper();
        let (tx, rx) = mpsc::channel::<u8>();
        let cancelled = tx.clone();
        let id = looper.post_delayed(
            Box::new(move || {
                let _ = cancelled.send(1);
            }),
            Duration::from_millis(30),
        );
        looper.post_delayed(
            Box::new(move || {
                let _ = tx.send(2);
            }),
            Duration::from_millis(60),
        );
        looper.remove_callbacks(id);
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 2);
    }

    #[test]
    fn host_scheduler_over_a_loop_thread() {
        let thread = LoopThread::start("rx-host-sched").unwrap();
        let scheduler = HostScheduler::new(thread.looper());
        let (tx, rx) = mpsc::channel();
        let probe = thread.looper();
        scheduler.schedule_direct(
            Box::new(move || {
                let _ = tx.send(probe.is_current_thread());
            }),
            Duration::from_millis(5),
        );
        assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
    }
}

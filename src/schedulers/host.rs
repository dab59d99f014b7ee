//! # Host-thread scheduler.
//!
//! Adapts any single-threaded dispatcher (a UI loop, a game loop, [`LoopThread`]) to the
//! [`Scheduler`] contract through the [`Looper`] trait.
//!
//! ## Rules
//! - Zero delay while already on the host thread: the task runs inline.
//! - Otherwise the task is posted to the host queue with its delay.
//! - Disposing a worker cancels every task it posted and removes the pending callbacks.
//!
//! [`LoopThread`]: crate::schedulers::LoopThread

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{Runnable, ScheduledTask, Scheduler, Worker, WorkerRef};
use crate::disposables::{Disposable, DisposableRef, disposed};
use crate::plugins::Plugins;

/// Identifier of a posted callback.
pub type PostId = u64;

/// A single-threaded host dispatcher.
pub trait Looper: Send + Sync + 'static {
    /// Queues `task` to run on the host thread after `delay`.
    fn post_delayed(&self, task: Runnable, delay: Duration) -> PostId;

    /// Removes a pending callback. Unknown or already-run ids are ignored.
    fn remove_callbacks(&self, id: PostId);

    /// Whether the caller is running on the host thread.
    fn is_current_thread(&self) -> bool;

    /// Host clock.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A [`Scheduler`] posting to a [`Looper`].
pub struct HostScheduler {
    looper: Arc<dyn Looper>,
}

impl HostScheduler {
    /// Wraps `looper`.
    pub fn new(looper: Arc<dyn Looper>) -> Arc<Self> {
        Arc::new(Self { looper })
    }
}

impl Scheduler for HostScheduler {
    fn now(&self) -> Instant {
        self.looper.now()
    }

    fn create_worker(&self) -> WorkerRef {
        Arc::new(HostWorker {
            looper: Arc::clone(&self.looper),
            token: CancellationToken::new(),
            posts: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn schedule_direct(&self, task: Runnable, delay: Duration) -> DisposableRef {
        let task = ScheduledTask::new(Plugins::global().on_schedule(task), CancellationToken::new());
        if delay.is_zero() && self.looper.is_current_thread() {
            task.run();
            return task;
        }
        let posted = Arc::clone(&task);
        let id = self
            .looper
            .post_delayed(Box::new(move || posted.run()), delay);
        Arc::new(HostPost {
            task,
            looper: Arc::clone(&self.looper),
            id,
            tracked: None,
        })
    }
}

/// A posted task: disposing it also removes the pending callback and, for worker tasks,
/// the worker's bookkeeping entry.
struct HostPost {
    task: Arc<ScheduledTask>,
    looper: Arc<dyn Looper>,
    id: PostId,
    tracked: Option<(PostMap, PostKey)>,
}

impl Disposable for HostPost {
    fn dispose(&self) {
        self.task.dispose();
        if let Some((posts, key)) = &self.tracked {
            posts.lock().remove(key);
        }
        self.looper.remove_callbacks(self.id);
    }

    fn is_disposed(&self) -> bool {
        self.task.is_disposed()
    }
}

type PostKey = usize;
type PostMap = Arc<Mutex<HashMap<PostKey, PostId>>>;

struct HostWorker {
    looper: Arc<dyn Looper>,
    token: CancellationToken,
    posts: PostMap,
}

impl Worker for HostWorker {
    fn schedule(&self, task: Runnable, delay: Duration) -> DisposableRef {
        if self.token.is_cancelled() {
            return disposed();
        }
        let task = ScheduledTask::new(
            Plugins::global().on_schedule(task),
            self.token.child_token(),
        );
        if delay.is_zero() && self.looper.is_current_thread() {
            task.run();
            return task;
        }

        let key = Arc::as_ptr(&task) as PostKey;
        let posted = Arc::clone(&task);
        let posts = Arc::clone(&self.posts);
        let id = self.looper.post_delayed(
            Box::new(move || {
                posted.run();
                posts.lock().remove(&key);
            }),
            delay,
        );
        {
            let mut posts = self.posts.lock();
            if !task.is_disposed() {
                posts.insert(key, id);
            }
        }

        if self.token.is_cancelled() {
            self.looper.remove_callbacks(id);
            return disposed();
        }
        Arc::new(HostPost {
            task,
            looper: Arc::clone(&self.looper),
            id,
            tracked: Some((Arc::clone(&self.posts), key)),
        })
    }

    fn dispose(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        let pending: Vec<PostId> = self.posts.lock().drain().map(|(_, id)| id).collect();
        for id in pending {
            self.looper.remove_callbacks(id);
        }
        tracing::trace!("host worker disposed");
    }

    fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }

    fn now(&self) -> Instant {
        self.looper.now()
    }
}

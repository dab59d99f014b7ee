//! Shared bookkeeping for synchronous one-in/one-out operators.

use crate::disposables::DisposableRef;
use crate::error::RxError;
use crate::observers::BoxObserver;
use crate::plugins::Plugins;

/// Downstream plus the upstream handle and a terminal latch.
///
/// Upstream handles are passed through unchanged: disposing downstream disposes upstream.
pub(crate) struct Stage<U> {
    downstream: BoxObserver<U>,
    upstream: Option<DisposableRef>,
    done: bool,
}

impl<U> Stage<U> {
    pub(crate) fn new(downstream: BoxObserver<U>) -> Self {
        Self {
            downstream,
            upstream: None,
            done: false,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    pub(crate) fn subscribe(&mut self, d: DisposableRef) {
        self.upstream = Some(d.clone());
        self.downstream.on_subscribe(d);
    }

    pub(crate) fn next(&mut self, value: U) {
        if !self.done {
            self.downstream.on_next(value);
        }
    }

    /// A user callback failed: cancel upstream, then signal the failure downstream.
    pub(crate) fn fail(&mut self, error: RxError) {
        self.cancel();
        self.error(error);
    }

    pub(crate) fn cancel(&self) {
        if let Some(upstream) = &self.upstream {
            upstream.dispose();
        }
    }

    pub(crate) fn error(&mut self, error: RxError) {
        if self.done {
            Plugins::global().on_error(error);
            return;
        }
        self.done = true;
        self.downstream.on_error(error);
    }

    pub(crate) fn complete(&mut self) {
        if !self.done {
            self.done = true;
            self.downstream.on_complete();
        }
    }
}

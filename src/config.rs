//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the built-in schedulers and the
//! async-boundary operators.
//!
//! Config is used in two ways:
//! 1. **Process defaults**: [`Config::global`] reads the environment once and caches it;
//!    `observe_on` and the built-in schedulers use it.
//! 2. **Explicit construction**: build a `Config` by hand and pass it to
//!    [`Schedulers::computation_with`](crate::Schedulers::computation_with) and friends.
//!
//! ## Environment
//! - `RXVISOR_BUFFER_SIZE` → [`Config::buffer_size`] (min 1)
//! - `RXVISOR_COMPUTATION_THREADS` → [`Config::computation_threads`] (`0` = one per core)
//! - `RXVISOR_IO_MAX_THREADS` → [`Config::io_max_threads`] (min 1)
//!
//! Unparseable values are ignored and the default is kept.

use std::sync::OnceLock;
use std::time::Duration;

static GLOBAL: OnceLock<Config> = OnceLock::new();

/// Runtime configuration for rxvisor.
///
/// ## Field semantics
/// - `buffer_size`: Initial capacity of async-boundary queues (min 1)
/// - `computation_threads`: Worker threads of the computation pool (`0` = one per core)
/// - `io_max_threads`: Upper bound of the blocking io pool
/// - `io_keep_alive`: How long an idle io thread is kept before it exits
#[derive(Clone, Debug)]
pub struct Config {
    /// Initial capacity of the queues used by `observe_on`.
    pub buffer_size: usize,

    /// Number of threads of the computation scheduler.
    ///
    /// - `0` = one per available core
    /// - `n > 0` = exactly `n`
    pub computation_threads: usize,

    /// Upper bound on the threads of the io scheduler's blocking pool.
    ///
    /// The pool grows on demand up to this bound.
    pub io_max_threads: usize,

    /// Idle time after which an io thread is released.
    pub io_keep_alive: Duration,
}

impl Config {
    /// Reads the configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = read_usize("RXVISOR_BUFFER_SIZE") {
            cfg.buffer_size = v;
        }
        if let Some(v) = read_usize("RXVISOR_COMPUTATION_THREADS") {
            cfg.computation_threads = v;
        }
        if let Some(v) = read_usize("RXVISOR_IO_MAX_THREADS") {
            cfg.io_max_threads = v;
        }
        cfg
    }

    /// Process-wide configuration, read from the environment on first use and cached.
    pub fn global() -> &'static Config {
        GLOBAL.get_or_init(Config::from_env)
    }

    /// Returns the async-boundary buffer size clamped to a minimum of 1.
    #[inline]
    pub fn buffer_size_clamped(&self) -> usize {
        self.buffer_size.max(1)
    }

    /// Returns the effective computation thread count.
    ///
    /// - `0` → number of available cores (at least 1)
    /// - `n` → `n`
    #[inline]
    pub fn computation_threads_effective(&self) -> usize {
        match self.computation_threads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    /// Returns the io pool bound clamped to a minimum of 1.
    #[inline]
    pub fn io_max_threads_clamped(&self) -> usize {
        self.io_max_threads.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `buffer_size = 128`
    /// - `computation_threads = 0` (one per core)
    /// - `io_max_threads = 512`
    /// - `io_keep_alive = 60s`
    fn default() -> Self {
        Self {
            buffer_size: 128,
            computation_threads: 0,
            io_max_threads: 512,
            io_keep_alive: Duration::from_secs(60),
        }
    }
}

fn read_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring malformed configuration variable");
            None
        }
    }
}

/// Process-wide async-boundary buffer size (`RXVISOR_BUFFER_SIZE`, default 128, min 1).
pub(crate) fn buffer_size() -> usize {
    Config::global().buffer_size_clamped()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_clamped() {
        let cfg = Config {
            buffer_size: 0,
            computation_threads: 0,
            io_max_threads: 0,
            io_keep_alive: Duration::ZERO,
        };
        assert_eq!(cfg.buffer_size_clamped(), 1);
        assert_eq!(cfg.io_max_threads_clamped(), 1);
        assert!(cfg.computation_threads_effective() >= 1);
    }

    #[test]
    fn explicit_thread_count_wins() {
        let cfg = Config {
            computation_threads: 3,
            ..Config::default()
        };
        assert_eq!(cfg.computation_threads_effective(), 3);
    }

    #[test]
    fn global_is_cached() {
        let a = Config::global() as *const Config;
        let b = Config::global() as *const Config;
        assert_eq!(a, b);
        assert!(buffer_size() >= 1);
    }
}

//! Settings for the asynchronous transport decorator.

use std::time::Duration;

use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

/// Default number of events that may wait for a worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// Default time `close` waits for workers to finish.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration consumed by [`AsyncTransport`](super::AsyncTransport).
#[derive(Clone, Debug)]
pub struct AsyncTransportConfig {
    /// Number of worker threads.
    pub threads: usize,
    /// Capacity of the queue shared by the workers.
    pub queue_capacity: usize,
    /// Bound on the wait performed by `close`.
    pub shutdown_timeout: Duration,
    /// Close the wrapped transport when this one is closed.
    pub propagate_close: bool,
    /// Minimum spacing of "dropped events" warnings.
    pub warn_interval: Duration,
}

impl Default for AsyncTransportConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            propagate_close: true,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl AsyncTransportConfig {
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_propagate_close(mut self, propagate: bool) -> Self {
        self.propagate_close = propagate;
        self
    }
}

/// One worker per available CPU, at least one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

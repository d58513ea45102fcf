//! Non-blocking decorator running another transport on a worker pool.
//!
//! [`AsyncTransport::send`] only enqueues; a fixed set of named worker
//! threads share one bounded queue and forward events to the wrapped
//! transport. When the queue is full the event is dropped and a
//! rate-limited warning is logged. Events may be delivered out of order.
//!
//! Shutdown happens once, on [`close`](Transport::close) or drop: the queue
//! stops accepting events, workers drain it, and the caller waits up to the
//! configured timeout. Workers still busy after that discard whatever is
//! left.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, warn};
use parking_lot::RwLock;

use super::{Transport, TransportError};
use crate::event::Event;
use crate::rate_limited_warner::RateLimitedWarner;

mod config;
mod worker;

pub use config::{
    AsyncTransportConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT, default_threads,
};


/// Runs the wrapped transport on a pool of worker threads.
pub struct AsyncTransport {
    tx: RwLock<Option<Sender<Event>>>,
    done: Receiver<()>,
    abandon: Arc<AtomicBool>,
    closed: AtomicBool,
    actual: Arc<dyn Transport>,
    config: AsyncTransportConfig,
    warner: RateLimitedWarner,
}

impl AsyncTransport {
    /// Wrap `actual` and start the worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if a worker thread cannot be spawned.
    pub fn new(
        actual: Arc<dyn Transport>,
        config: AsyncTransportConfig,
    ) -> Result<Self, TransportError> {
        let threads = config.threads.max(1);
        let (tx, rx) = bounded(config.queue_capacity.max(1));
        let abandon = Arc::new(AtomicBool::new(false));
        let done = worker::spawn_workers(threads, &rx, &actual, &abandon)?;
        debug!(
            "started {threads} async transport workers (queue capacity {})",
            config.queue_capacity
        );
        Ok(Self {
            tx: RwLock::new(Some(tx)),
            done,
            abandon,
            closed: AtomicBool::new(false),
            actual,
            warner: RateLimitedWarner::new(config.warn_interval),
            config: AsyncTransportConfig { threads, ..config },
        })
    }

    pub fn config(&self) -> &AsyncTransportConfig {
        &self.config
    }

    /// Events dropped because the queue was full or closed.
    pub fn dropped_events(&self) -> u64 {
        self.warner.dropped_total()
    }

    fn sender(&self) -> Option<Sender<Event>> {
        self.tx.read().as_ref().cloned()
    }

    fn record_drop(&self, reason: &str) {
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("async transport {reason}; dropped {count} events");
        });
    }

    /// Wait for every worker to report completion, up to the shutdown
    /// timeout. Returns the number still running.
    fn await_workers(&self) -> usize {
        let deadline = Instant::now() + self.config.shutdown_timeout;
        let mut remaining = self.config.threads;
        while remaining > 0 {
            if self.done.recv_deadline(deadline).is_err() {
                break;
            }
            remaining -= 1;
        }
        remaining
    }
}

impl Transport for AsyncTransport {
    fn send(&self, event: &Event) -> Result<(), TransportError> {
        let Some(tx) = self.sender() else {
            self.record_drop("is closed");
            return Err(TransportError::Closed);
        };
        match tx.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.record_drop("queue full");
                Err(TransportError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.record_drop("workers stopped");
                Err(TransportError::Closed)
            }
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Dropping the last sender lets workers drain and exit.
        drop(self.tx.write().take());
        let running = self.await_workers();
        if running > 0 {
            self.abandon.store(true, Ordering::Release);
            warn!(
                "{running} async transport workers still busy after {:?}; pending events are discarded",
                self.config.shutdown_timeout
            );
        }
        self.warner.flush(|count| {
            warn!("async transport dropped {count} events before closing");
        });
        if self.config.propagate_close {
            self.actual.close()?;
        }
        Ok(())
    }
}

impl Drop for AsyncTransport {
    fn drop(&mut self) {
        if let Err(err) = Transport::close(self) {
            warn!("error while closing async transport: {err}");
        }
    }
}

impl std::fmt::Debug for AsyncTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTransport")
            .field("config", &self.config)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

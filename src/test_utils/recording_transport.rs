//! A transport that keeps events in memory for test assertions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::{Condvar, Mutex};

use crate::event::Event;
use crate::transport::{Transport, TransportError};

/// Records every event it is asked to send.
///
/// Optionally each send can block on a gate, sleep, or fail after recording.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    events: Mutex<Vec<Event>>,
    arrived: Condvar,
    closes: AtomicUsize,
    delay: Option<Duration>,
    gate: Option<Receiver<()>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send sleeps for `delay` before recording.
    pub fn with_delay(delay: Duration) -> Self {
        Self::from_inner(Inner {
            delay: Some(delay),
            ..Inner::default()
        })
    }

    /// Every send records, then returns an error.
    pub fn failing() -> Self {
        Self::from_inner(Inner {
            fail: true,
            ..Inner::default()
        })
    }

    /// Every send waits for one `()` on the returned sender, or for it to
    /// be dropped.
    pub fn gated() -> (Self, Sender<()>) {
        let (tx, rx) = bounded(0);
        let transport = Self::from_inner(Inner {
            gate: Some(rx),
            ..Inner::default()
        });
        (transport, tx)
    }

    fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Snapshot of the events sent so far.
    pub fn events(&self) -> Vec<Event> {
        self.inner.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times `close` was called.
    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` events were recorded.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.inner.events.lock();
        while events.len() < count {
            if self
                .inner
                .arrived
                .wait_until(&mut events, deadline)
                .timed_out()
            {
                return events.len() >= count;
            }
        }
        true
    }
}

impl Transport for RecordingTransport {
    fn send(&self, event: &Event) -> Result<(), TransportError> {
        if let Some(gate) = &self.inner.gate {
            let _ = gate.recv();
        }
        if let Some(delay) = self.inner.delay {
            std::thread::sleep(delay);
        }
        self.inner.events.lock().push(event.clone());
        self.inner.arrived.notify_all();
        if self.inner.fail {
            return Err(TransportError::ServerStatus { status: 500 });
        }
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//! Worker threads draining the shared event queue.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, warn};

use crate::event::Event;
use crate::scope::ReportingScope;
use crate::transport::Transport;

/// Spawn `count` workers sharing `rx`.
///
/// Each worker sends one `()` on the returned channel when it exits. Workers
/// exit once every sender of `rx` is gone and the queue is drained, or as
/// soon as `abandon` is set.
pub(super) fn spawn_workers(
    count: usize,
    rx: &Receiver<Event>,
    transport: &Arc<dyn Transport>,
    abandon: &Arc<AtomicBool>,
) -> io::Result<Receiver<()>> {
    let (done_tx, done_rx) = bounded(count);
    for index in 0..count {
        let rx = rx.clone();
        let transport = Arc::clone(transport);
        let abandon = Arc::clone(abandon);
        let done_tx = done_tx.clone();
        thread::Builder::new()
            .name(format!("raven-async-{index}"))
            .spawn(move || worker_loop(&rx, transport.as_ref(), &abandon, &done_tx))?;
    }
    Ok(done_rx)
}

fn worker_loop(
    rx: &Receiver<Event>,
    transport: &dyn Transport,
    abandon: &AtomicBool,
    done: &Sender<()>,
) {
    // Anything the transport logs from this thread must not be reported.
    let _scope = ReportingScope::enter();
    while let Ok(event) = rx.recv() {
        if abandon.load(Ordering::Acquire) {
            debug!("discarding event {} after shutdown timeout", event.id().simple());
            continue;
        }
        if let Err(err) = transport.send(&event) {
            warn!("failed to send event {}: {err}", event.id().simple());
        }
    }
    let _ = done.send(());
}

//! Client facade tying builder helpers and a transport together.
//!
//! Adapters build an event, let the client's [`BuilderHelper`]s enrich it,
//! then hand it to [`Client::send_event`], which never fails outward.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use raven_rs::client::{BuilderHelper, Client};
//! use raven_rs::event::{Event, EventBuilder};
//! use raven_rs::transport::{Transport, TransportError};
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<Event>>);
//!
//! impl Transport for Collect {
//!     fn send(&self, event: &Event) -> Result<(), TransportError> {
//!         self.0.lock().unwrap().push(event.clone());
//!         Ok(())
//!     }
//! }
//!
//! let transport = Arc::new(Collect::default());
//! let client = Client::new(transport.clone());
//! let helper: Arc<dyn BuilderHelper> = Arc::new(|b: &mut EventBuilder| {
//!     b.add_tag("release", "1.2.0");
//! });
//! client.add_builder_helper(helper);
//!
//! let mut builder = EventBuilder::new();
//! builder.set_message("cache miss storm").set_server_name("web-1");
//! client.run_builder_helpers(&mut builder);
//! client.send_event(builder.build().unwrap());
//!
//! assert_eq!(transport.0.lock().unwrap()[0].tags()["release"], "1.2.0");
//! ```

use std::error::Error;
use std::sync::Arc;

use log::{debug, error};
use parking_lot::RwLock;

use crate::event::capture::capture_frames;
use crate::event::interfaces::ExceptionInterface;
use crate::event::{Event, EventBuilder, HostnameCache};
use crate::exception_schema::ExceptionChain;
use crate::level::Level;
use crate::scope::ReportingScope;
use crate::transport::{Transport, TransportError};

/// Enriches every event built through a [`Client`].
pub trait BuilderHelper: Send + Sync {
    fn help_building_event(&self, builder: &mut EventBuilder);
}

impl<F> BuilderHelper for F
where
    F: Fn(&mut EventBuilder) + Send + Sync,
{
    fn help_building_event(&self, builder: &mut EventBuilder) {
        self(builder);
    }
}

/// What logging adapters need from a client.
pub trait EventSink: Send + Sync {
    fn run_builder_helpers(&self, builder: &mut EventBuilder);
    fn send_event(&self, event: Event);
}

type HelperSet = Arc<Vec<Arc<dyn BuilderHelper>>>;

/// Sends events through one transport.
///
/// The helper set is copy-on-write: running helpers iterates a snapshot, so
/// helpers can be added or removed from any thread at any time.
pub struct Client {
    transport: Arc<dyn Transport>,
    helpers: RwLock<HelperSet>,
    hostname_cache: Option<Arc<HostnameCache>>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            helpers: RwLock::new(Arc::new(Vec::new())),
            hostname_cache: None,
        }
    }

    /// Resolve server names of events built by this client through `cache`.
    #[must_use]
    pub fn with_hostname_cache(mut self, cache: Arc<HostnameCache>) -> Self {
        self.hostname_cache = Some(cache);
        self
    }

    /// Send `event`, logging instead of returning any failure.
    ///
    /// Calls made while this thread is already reporting are dropped.
    pub fn send_event(&self, event: Event) {
        let Some(_scope) = ReportingScope::enter() else {
            debug!("dropping event {} raised while reporting", event.id().simple());
            return;
        };
        match self.transport.send(&event) {
            Ok(()) => {}
            // The async decorator has already counted and rate-limited these.
            Err(err @ (TransportError::QueueFull | TransportError::Closed)) => {
                debug!("event {} not queued: {err}", event.id().simple());
            }
            Err(err) => {
                error!("an error occurred while sending event {}: {err}", event.id().simple());
            }
        }
    }

    /// Apply every registered helper to `builder`.
    pub fn run_builder_helpers(&self, builder: &mut EventBuilder) {
        let helpers = self.builder_helpers();
        for helper in helpers.iter() {
            helper.help_building_event(builder);
        }
    }

    /// Register `helper`; registering the same `Arc` twice has no effect.
    pub fn add_builder_helper(&self, helper: Arc<dyn BuilderHelper>) {
        let mut helpers = self.helpers.write();
        if helpers.iter().any(|h| Arc::ptr_eq(h, &helper)) {
            return;
        }
        let mut next = Vec::with_capacity(helpers.len() + 1);
        next.extend(helpers.iter().cloned());
        next.push(helper);
        *helpers = Arc::new(next);
    }

    /// Remove `helper`, matched by identity.
    pub fn remove_builder_helper(&self, helper: &Arc<dyn BuilderHelper>) -> bool {
        let mut helpers = self.helpers.write();
        let Some(pos) = helpers.iter().position(|h| Arc::ptr_eq(h, helper)) else {
            return false;
        };
        let mut next: Vec<_> = helpers.iter().cloned().collect();
        next.remove(pos);
        *helpers = Arc::new(next);
        true
    }

    /// Snapshot of the registered helpers.
    pub fn builder_helpers(&self) -> HelperSet {
        Arc::clone(&self.helpers.read())
    }

    /// A fresh builder using this client's host name cache, if any.
    pub fn new_builder(&self) -> EventBuilder {
        match &self.hostname_cache {
            Some(cache) => EventBuilder::new().with_hostname_cache(Arc::clone(cache)),
            None => EventBuilder::new(),
        }
    }

    /// Build, enrich and send an informational message.
    pub fn capture_message(&self, message: &str) {
        let mut builder = self.new_builder();
        builder.set_message(message).set_level(Level::Info);
        self.build_and_send(builder);
    }

    /// Build, enrich and send `err` with its cause chain.
    ///
    /// The stack of the calling thread is attached to the outermost error.
    pub fn capture_error<E: Error + 'static>(&self, err: &E) {
        let chain = ExceptionChain::from_typed_error(err).with_outer_frames(capture_frames());
        let mut builder = self.new_builder();
        builder
            .set_message(err.to_string())
            .set_level(Level::Error)
            .add_interface(ExceptionInterface::new(chain));
        self.build_and_send(builder);
    }

    fn build_and_send(&self, mut builder: EventBuilder) {
        self.run_builder_helpers(&mut builder);
        match builder.build() {
            Ok(event) => self.send_event(event),
            Err(err) => error!("could not build event: {err}"),
        }
    }

    /// Close the underlying transport.
    pub fn close(&self) -> Result<(), TransportError> {
        self.transport.close()
    }
}

impl EventSink for Client {
    fn run_builder_helpers(&self, builder: &mut EventBuilder) {
        Client::run_builder_helpers(self, builder);
    }

    fn send_event(&self, event: Event) {
        Client::send_event(self, event);
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("helpers", &self.helpers.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

//! The event reported to the backend.
//!
//! An [`Event`] is assembled once by an [`EventBuilder`] and is immutable
//! afterwards. Collections are exposed as shared borrows, so consumers get
//! read-only views.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::level::Level;

pub mod builder;
pub mod capture;
pub mod hostname;
pub mod interfaces;

pub use builder::{BuilderError, DEFAULT_PLATFORM, EventBuilder};
pub use hostname::HostnameCache;
pub use interfaces::EventInterface;

/// An occurrence ready to be marshalled and sent.
#[derive(Clone, Debug)]
pub struct Event {
    pub(crate) id: Uuid,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) message: Option<String>,
    pub(crate) level: Option<Level>,
    pub(crate) logger: Option<String>,
    pub(crate) platform: String,
    pub(crate) culprit: Option<String>,
    pub(crate) server_name: String,
    pub(crate) tags: BTreeMap<String, String>,
    pub(crate) extra: BTreeMap<String, Value>,
    pub(crate) checksum: Option<String>,
    pub(crate) interfaces: BTreeMap<&'static str, Arc<dyn EventInterface>>,
}

impl Event {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn logger(&self) -> Option<&str> {
        self.logger.as_deref()
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn culprit(&self) -> Option<&str> {
        self.culprit.as_deref()
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Attached payloads keyed by interface name.
    pub fn interfaces(&self) -> &BTreeMap<&'static str, Arc<dyn EventInterface>> {
        &self.interfaces
    }

    pub fn interface(&self, name: &str) -> Option<&Arc<dyn EventInterface>> {
        self.interfaces.get(name)
    }

    /// Downcast the payload stored under `name`.
    pub fn interface_as<T: 'static>(&self, name: &str) -> Option<&T> {
        self.interfaces.get(name)?.as_any().downcast_ref::<T>()
    }
}

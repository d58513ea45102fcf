//! Single-use builder for [`Event`].
//!
//! Setters chain on `&mut self`; [`EventBuilder::build`] hands out the event
//! and leaves the builder spent.
//!
//! ```rust
//! use raven_rs::event::EventBuilder;
//! use raven_rs::level::Level;
//!
//! let mut builder = EventBuilder::new();
//! builder
//!     .set_message("disk full")
//!     .set_level(Level::Error)
//!     .set_logger("app::storage")
//!     .add_tag("volume", "/var")
//!     .generate_checksum("app::storage.flush(storage.rs:88)");
//! let event = builder.build().expect("first build");
//!
//! assert_eq!(event.culprit(), Some("app::storage"));
//! assert!(builder.build().is_err());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::{Event, EventInterface, HostnameCache};
use crate::exception_schema::{ExceptionChain, StackFrame};
use crate::grouping::{self, ChecksumHasher, Crc32Hasher};
use crate::level::Level;

/// Platform reported when none is set.
pub const DEFAULT_PLATFORM: &str = "rust";

/// Errors raised while building an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("event has already been built")]
    AlreadyBuilt,
    #[error("event id must not be empty")]
    EmptyId,
    #[error("event id is not a valid UUID: {0:?}")]
    InvalidId(String),
}

#[derive(Default)]
struct Draft {
    id: Option<Uuid>,
    timestamp: Option<DateTime<Utc>>,
    message: Option<String>,
    level: Option<Level>,
    logger: Option<String>,
    platform: Option<String>,
    culprit: Option<String>,
    server_name: Option<String>,
    tags: BTreeMap<String, String>,
    extra: BTreeMap<String, Value>,
    checksum: Option<String>,
    interfaces: BTreeMap<&'static str, Arc<dyn EventInterface>>,
}

/// Accumulates event attributes, then produces one [`Event`].
pub struct EventBuilder {
    draft: Draft,
    built: bool,
    hostname_cache: Option<Arc<HostnameCache>>,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBuilder {
    /// Builder whose event receives a random id at build time.
    pub fn new() -> Self {
        Self {
            draft: Draft::default(),
            built: false,
            hostname_cache: None,
        }
    }

    /// Builder for an event with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::EmptyId`] for the nil UUID.
    pub fn with_id(id: Uuid) -> Result<Self, BuilderError> {
        if id.is_nil() {
            return Err(BuilderError::EmptyId);
        }
        let mut builder = Self::new();
        builder.draft.id = Some(id);
        Ok(builder)
    }

    /// Like [`with_id`](Self::with_id), parsing the id from a string.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::EmptyId`] when `id` is blank or the nil UUID,
    /// and [`BuilderError::InvalidId`] when it is not a UUID at all.
    pub fn with_id_str(id: &str) -> Result<Self, BuilderError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(BuilderError::EmptyId);
        }
        let parsed = Uuid::parse_str(id).map_err(|_| BuilderError::InvalidId(id.to_owned()))?;
        Self::with_id(parsed)
    }

    /// Resolve the server name through `cache` instead of the global cache.
    #[must_use]
    pub fn with_hostname_cache(mut self, cache: Arc<HostnameCache>) -> Self {
        self.hostname_cache = Some(cache);
        self
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.draft.message = Some(message.into());
        self
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) -> &mut Self {
        self.draft.timestamp = Some(timestamp);
        self
    }

    pub fn set_level(&mut self, level: Level) -> &mut Self {
        self.draft.level = Some(level);
        self
    }

    pub fn set_logger(&mut self, logger: impl Into<String>) -> &mut Self {
        self.draft.logger = Some(logger.into());
        self
    }

    pub fn set_platform(&mut self, platform: impl Into<String>) -> &mut Self {
        self.draft.platform = Some(platform.into());
        self
    }

    pub fn set_culprit(&mut self, culprit: impl Into<String>) -> &mut Self {
        self.draft.culprit = Some(culprit.into());
        self
    }

    /// Use the location of `frame` as the culprit.
    pub fn set_culprit_frame(&mut self, frame: &StackFrame) -> &mut Self {
        self.set_culprit(grouping::format_culprit(frame))
    }

    pub fn set_server_name(&mut self, server_name: impl Into<String>) -> &mut Self {
        self.draft.server_name = Some(server_name.into());
        self
    }

    /// Add a tag, replacing any previous value for `key`.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.draft.tags.insert(key.into(), value.into());
        self
    }

    /// Add an extra attribute, replacing any previous value for `key`.
    pub fn add_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.draft.extra.insert(key.into(), value.into());
        self
    }

    /// Attach a payload; a payload of the same kind is replaced.
    pub fn add_interface<I: EventInterface + 'static>(&mut self, interface: I) -> &mut Self {
        self.add_shared_interface(Arc::new(interface))
    }

    pub fn add_shared_interface(&mut self, interface: Arc<dyn EventInterface>) -> &mut Self {
        self.draft
            .interfaces
            .insert(interface.interface_name(), interface);
        self
    }

    pub fn set_checksum(&mut self, checksum: impl Into<String>) -> &mut Self {
        self.draft.checksum = Some(checksum.into());
        self
    }

    /// Checksum `signature` with the default hasher.
    pub fn generate_checksum(&mut self, signature: &str) -> &mut Self {
        self.generate_checksum_with(signature, &Crc32Hasher)
    }

    pub fn generate_checksum_with(
        &mut self,
        signature: &str,
        hasher: &dyn ChecksumHasher,
    ) -> &mut Self {
        self.set_checksum(hasher.checksum(signature))
    }

    /// Derive the checksum from an error chain or call site.
    ///
    /// Leaves the checksum untouched when neither yields a signature.
    pub fn generate_grouping_checksum(
        &mut self,
        chain: Option<&ExceptionChain>,
        call_site: Option<&StackFrame>,
    ) -> &mut Self {
        if let Some(signature) = grouping::grouping_signature(chain, call_site) {
            self.generate_checksum(&signature);
        }
        self
    }

    /// Materialise the event, filling in any missing mandatory field.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::AlreadyBuilt`] on every call after the first.
    pub fn build(&mut self) -> Result<Event, BuilderError> {
        if self.built {
            return Err(BuilderError::AlreadyBuilt);
        }
        self.built = true;
        let draft = std::mem::take(&mut self.draft);
        let server_name = match draft.server_name {
            Some(name) => name,
            None => self
                .hostname_cache
                .clone()
                .unwrap_or_else(HostnameCache::global)
                .hostname(),
        };
        let culprit = draft.culprit.or_else(|| draft.logger.clone());
        Ok(Event {
            id: draft.id.unwrap_or_else(Uuid::new_v4),
            timestamp: draft.timestamp.unwrap_or_else(Utc::now),
            message: draft.message,
            level: draft.level,
            logger: draft.logger,
            platform: draft
                .platform
                .unwrap_or_else(|| DEFAULT_PLATFORM.to_owned()),
            culprit,
            server_name,
            tags: draft.tags,
            extra: draft.extra,
            checksum: draft.checksum,
            interfaces: draft.interfaces,
        })
    }
}

impl std::fmt::Debug for EventBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBuilder")
            .field("id", &self.draft.id)
            .field("built", &self.built)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;

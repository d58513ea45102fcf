//! Event serialisation.
//!
//! [`JsonMarshaller`] writes an [`Event`] as the JSON document the backend
//! expects. Payloads are written by [`InterfaceBinding`]s looked up by
//! interface name, so new payload kinds only need a new binding.
//!
//! With compression enabled the document is zlib-deflated and then base64
//! encoded, which is the compressed body format of protocol version 3.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::write::EncoderWriter;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use log::warn;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::event::Event;
use crate::event::interfaces::{
    EXCEPTION_INTERFACE, HTTP_INTERFACE, MESSAGE_INTERFACE, STACKTRACE_INTERFACE,
};

mod bindings;

pub use bindings::{
    ExceptionBinding, HttpBinding, InterfaceBinding, MessageBinding, StackTraceBinding,
};

/// Format of the `timestamp` field, always UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Errors raised while marshalling an event.
#[derive(Debug, Error)]
pub enum MarshallError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error while writing event: {0}")]
    Io(#[from] io::Error),
    /// A binding received a payload of a type it cannot write.
    #[error("binding for {0} received an unexpected interface type")]
    UnexpectedInterface(&'static str),
}

/// Turns an event into bytes for a transport.
pub trait Marshaller: Send + Sync {
    /// Write `event` to `out`.
    fn marshall(&self, event: &Event, out: &mut dyn Write) -> Result<(), MarshallError>;

    /// `Content-Type` of the marshalled body.
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    /// Marshall `event` into a fresh buffer.
    fn to_vec(&self, event: &Event) -> Result<Vec<u8>, MarshallError> {
        let mut buf = Vec::with_capacity(1024);
        self.marshall(event, &mut buf)?;
        Ok(buf)
    }
}

/// JSON marshaller with a registry of interface bindings.
pub struct JsonMarshaller {
    bindings: HashMap<&'static str, Box<dyn InterfaceBinding>>,
    compression: bool,
}

impl Default for JsonMarshaller {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonMarshaller {
    /// Marshaller with no bindings and compression enabled.
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            compression: true,
        }
    }

    /// Marshaller with the four built-in bindings registered.
    ///
    /// `stack_trace` is used both for stand-alone stack traces and for the
    /// stack of every exception.
    pub fn with_default_bindings(stack_trace: StackTraceBinding) -> Self {
        let mut marshaller = Self::new();
        marshaller
            .add_binding(
                EXCEPTION_INTERFACE,
                ExceptionBinding::new(stack_trace.clone()),
            )
            .add_binding(STACKTRACE_INTERFACE, stack_trace)
            .add_binding(MESSAGE_INTERFACE, MessageBinding)
            .add_binding(HTTP_INTERFACE, HttpBinding);
        marshaller
    }

    /// Register `binding` for payloads named `interface_name`, replacing any
    /// previous binding.
    pub fn add_binding<B: InterfaceBinding + 'static>(
        &mut self,
        interface_name: &'static str,
        binding: B,
    ) -> &mut Self {
        self.bindings.insert(interface_name, Box::new(binding));
        self
    }

    pub fn has_binding(&self, interface_name: &str) -> bool {
        self.bindings.contains_key(interface_name)
    }

    pub fn set_compression(&mut self, compression: bool) -> &mut Self {
        self.compression = compression;
        self
    }

    pub fn compression(&self) -> bool {
        self.compression
    }

    fn interface_values(
        &self,
        event: &Event,
    ) -> Result<BTreeMap<&'static str, Value>, MarshallError> {
        let mut values = BTreeMap::new();
        for (name, interface) in event.interfaces() {
            match self.bindings.get(name) {
                Some(binding) => {
                    values.insert(*name, binding.write_interface(interface.as_ref())?);
                }
                None => warn!("no binding registered for interface {name}; skipping it"),
            }
        }
        Ok(values)
    }

    fn write_document(&self, event: &Event, out: &mut dyn Write) -> Result<(), MarshallError> {
        let document = SerializableEvent {
            event,
            interfaces: self.interface_values(event)?,
        };
        serde_json::to_writer(out, &document)?;
        Ok(())
    }
}

impl Marshaller for JsonMarshaller {
    fn marshall(&self, event: &Event, out: &mut dyn Write) -> Result<(), MarshallError> {
        if !self.compression {
            return self.write_document(event, out);
        }
        let base64 = EncoderWriter::new(out, &BASE64_STANDARD);
        let mut zlib = ZlibEncoder::new(base64, Compression::default());
        self.write_document(event, &mut zlib)?;
        let mut base64 = zlib.finish()?;
        base64.finish()?;
        Ok(())
    }

    fn content_type(&self) -> &'static str {
        if self.compression {
            "application/octet-stream"
        } else {
            "application/json"
        }
    }
}

impl std::fmt::Debug for JsonMarshaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.bindings.keys().collect();
        names.sort_unstable();
        f.debug_struct("JsonMarshaller")
            .field("bindings", &names)
            .field("compression", &self.compression)
            .finish()
    }
}

/// Borrowed view of an event in wire layout.
struct SerializableEvent<'a> {
    event: &'a Event,
    interfaces: BTreeMap<&'static str, Value>,
}

impl Serialize for SerializableEvent<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let event = self.event;
        let mut map = serializer.serialize_map(Some(12 + self.interfaces.len()))?;
        map.serialize_entry("event_id", &event.id().simple().to_string())?;
        map.serialize_entry("message", &event.message())?;
        map.serialize_entry(
            "timestamp",
            &format_args!("{}", event.timestamp().format(TIMESTAMP_FORMAT)),
        )?;
        map.serialize_entry("level", &event.level())?;
        map.serialize_entry("logger", &event.logger())?;
        map.serialize_entry("platform", event.platform())?;
        map.serialize_entry("culprit", &event.culprit())?;
        map.serialize_entry("tags", event.tags())?;
        map.serialize_entry("server_name", event.server_name())?;
        map.serialize_entry("modules", &BTreeMap::<String, String>::new())?;
        map.serialize_entry("extra", event.extra())?;
        map.serialize_entry("checksum", &event.checksum())?;
        for (name, value) in &self.interfaces {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests;

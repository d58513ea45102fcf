//! Turning a DSN into a ready client.
//!
//! A [`ClientFactory`] reads a [`Dsn`] and wires the matching transport and
//! marshaller into a [`Client`]. Factories live in a process-wide registry
//! keyed by name; `"default"` is always present and maps to
//! [`DefaultClientFactory`].
//!
//! Options understood by the default factory:
//!
//! | option                        | effect                                     |
//! |-------------------------------|--------------------------------------------|
//! | `raven.timeout`               | HTTP connect/read timeout in milliseconds  |
//! | `raven.async`                 | send through an [`AsyncTransport`]         |
//! | `raven.async.threads`         | worker count for the async transport       |
//! | `raven.async.queuesize`       | queue capacity for the async transport     |
//! | `raven.nocompression`         | send plain JSON                            |
//! | `raven.stacktrace.hidecommon` | mark frames shared with the enclosing trace |

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use thiserror::Error;

use crate::client::Client;
use crate::dsn::{Dsn, DsnLookup, InvalidDsn};
use crate::frame_filter::FrameFilter;
use crate::marshaller::{JsonMarshaller, Marshaller, StackTraceBinding};
use crate::transport::{
    AsyncTransport, AsyncTransportConfig, HttpTransport, HttpTransportConfig, Transport,
    TransportError, UdpTransport,
};

/// Name under which [`DefaultClientFactory`] is registered.
pub const DEFAULT_FACTORY_NAME: &str = "default";

pub const TIMEOUT_OPTION: &str = "raven.timeout";
pub const ASYNC_OPTION: &str = "raven.async";
pub const ASYNC_THREADS_OPTION: &str = "raven.async.threads";
pub const ASYNC_QUEUE_SIZE_OPTION: &str = "raven.async.queuesize";
pub const NO_COMPRESSION_OPTION: &str = "raven.nocompression";
pub const HIDE_COMMON_FRAMES_OPTION: &str = "raven.stacktrace.hidecommon";

/// Protocol setting that disables TLS verification.
pub const NAIVE_PROTOCOL_SETTING: &str = "naive";

/// Errors raised while creating a client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidDsn(#[from] InvalidDsn),
    /// No transport handles the DSN's scheme.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),
    /// No factory is registered under the requested name.
    #[error("unknown client factory: {0}")]
    UnknownFactory(String),
    /// An option value could not be parsed.
    #[error("invalid value {value:?} for option {name}")]
    InvalidOption { name: String, value: String },
    /// The transport could not be set up.
    #[error("failed to create transport: {0}")]
    Transport(#[from] TransportError),
}

/// Creates clients from DSNs.
pub trait ClientFactory: Send + Sync {
    fn create_client(&self, dsn: &Dsn) -> Result<Client, ConfigError>;
}

/// Factory wiring the bundled transports and JSON marshaller.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClientFactory;

impl DefaultClientFactory {
    /// Stack trace binding with the default frame filter.
    pub fn create_stack_trace_binding(&self, dsn: &Dsn) -> StackTraceBinding {
        let mut binding = StackTraceBinding::new(FrameFilter::default());
        binding.set_remove_common_frames_with_enclosing(has_flag(dsn, HIDE_COMMON_FRAMES_OPTION));
        binding
    }

    /// Marshaller configured from the DSN's options.
    pub fn create_marshaller(&self, dsn: &Dsn) -> JsonMarshaller {
        let mut marshaller =
            JsonMarshaller::with_default_bindings(self.create_stack_trace_binding(dsn));
        marshaller.set_compression(!has_flag(dsn, NO_COMPRESSION_OPTION));
        marshaller
    }

    /// Transport for the DSN's scheme, wrapped for async sending when asked.
    pub fn create_transport(&self, dsn: &Dsn) -> Result<Arc<dyn Transport>, ConfigError> {
        let marshaller: Arc<dyn Marshaller> = Arc::new(self.create_marshaller(dsn));
        let transport: Arc<dyn Transport> = match dsn.scheme() {
            "http" | "https" => {
                let mut config = HttpTransportConfig::default();
                if let Some(ms) = parse_option::<u64>(dsn, TIMEOUT_OPTION)? {
                    config.timeout = Duration::from_millis(ms);
                }
                config.bypass_security = dsn.has_protocol_setting(NAIVE_PROTOCOL_SETTING);
                Arc::new(HttpTransport::new(dsn, marshaller, config)?)
            }
            "udp" => Arc::new(UdpTransport::new(dsn, marshaller)?),
            other => return Err(ConfigError::UnsupportedProtocol(other.to_owned())),
        };
        if !has_flag(dsn, ASYNC_OPTION) {
            return Ok(transport);
        }

        let mut config = AsyncTransportConfig::default().with_propagate_close(true);
        if let Some(threads) = parse_option(dsn, ASYNC_THREADS_OPTION)? {
            config = config.with_threads(threads);
        }
        if let Some(capacity) = parse_option(dsn, ASYNC_QUEUE_SIZE_OPTION)? {
            config = config.with_queue_capacity(capacity);
        }
        Ok(Arc::new(AsyncTransport::new(transport, config)?))
    }
}

impl ClientFactory for DefaultClientFactory {
    fn create_client(&self, dsn: &Dsn) -> Result<Client, ConfigError> {
        let transport = self.create_transport(dsn)?;
        debug!("created {} client for {}", dsn.scheme(), dsn.endpoint());
        Ok(Client::new(transport))
    }
}

fn has_flag(dsn: &Dsn, name: &str) -> bool {
    dsn.option(name).is_some_and(|v| !v.eq_ignore_ascii_case("false"))
}

fn parse_option<T: FromStr>(dsn: &Dsn, name: &str) -> Result<Option<T>, ConfigError> {
    let Some(raw) = dsn.option(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidOption {
            name: name.to_owned(),
            value: raw.to_owned(),
        })
}

static FACTORIES: Lazy<RwLock<HashMap<String, Arc<dyn ClientFactory>>>> = Lazy::new(|| {
    let mut factories: HashMap<String, Arc<dyn ClientFactory>> = HashMap::new();
    factories.insert(DEFAULT_FACTORY_NAME.to_owned(), Arc::new(DefaultClientFactory));
    RwLock::new(factories)
});

/// Register `factory` under `name`, replacing any previous one.
pub fn register_factory(name: impl Into<String>, factory: Arc<dyn ClientFactory>) {
    let name = name.into();
    info!("registering client factory {name}");
    FACTORIES.write().insert(name, factory);
}

/// Look up a registered factory.
pub fn factory(name: &str) -> Option<Arc<dyn ClientFactory>> {
    FACTORIES.read().get(name).cloned()
}

/// Create a client for `dsn` with the named factory, or the default one.
pub fn client_instance(dsn: &Dsn, factory_name: Option<&str>) -> Result<Client, ConfigError> {
    let name = factory_name.unwrap_or(DEFAULT_FACTORY_NAME);
    let factory = factory(name).ok_or_else(|| ConfigError::UnknownFactory(name.to_owned()))?;
    factory.create_client(dsn)
}

/// Find a DSN through `lookup` and create a client with the default
/// factory. Returns `Ok(None)` when no DSN is configured.
pub fn client_from_lookup(lookup: &DsnLookup) -> Result<Option<Client>, ConfigError> {
    let Some(raw) = lookup.lookup() else {
        return Ok(None);
    };
    let dsn = Dsn::parse(&raw)?;
    client_instance(&dsn, None).map(Some)
}

//! Delivery of marshalled events to the backend.
//!
//! Every transport implements [`Transport`]. The synchronous ones
//! ([`HttpTransport`], [`UdpTransport`]) block the caller for the duration
//! of one send; [`AsyncTransport`] wraps any transport in a worker pool.
//! Delivery is best effort: nothing is retried or persisted.

use std::io;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::event::Event;
use crate::marshaller::MarshallError;

pub mod async_transport;
mod http;
mod udp;

pub use async_transport::{AsyncTransport, AsyncTransportConfig};
pub use http::{DEFAULT_TIMEOUT, HttpTransport, HttpTransportConfig};
pub use udp::{DEFAULT_UDP_PORT, UdpTransport};

/// Protocol version announced in the auth line.
pub const SENTRY_PROTOCOL_VERSION: &str = "3";

/// Client identifier sent with every event.
pub const USER_AGENT: &str = concat!("raven-rs/3.", env!("CARGO_PKG_VERSION_MINOR"));

/// Errors raised while sending an event.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("server responded with status {status}")]
    ServerStatus { status: u16 },
    #[error(transparent)]
    Serialization(#[from] MarshallError),
    /// The asynchronous queue was full and the event was dropped.
    #[error("send queue is full; event dropped")]
    QueueFull,
    #[error("transport is closed")]
    Closed,
}

/// Sends events to the backend.
pub trait Transport: Send + Sync {
    fn send(&self, event: &Event) -> Result<(), TransportError>;

    /// Release resources held by the transport.
    fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Build the authentication line sent with each event.
///
/// The signature is the hex HMAC-SHA256 of `"<timestamp> <public_key>"`
/// keyed with the secret key.
///
/// ```rust
/// use raven_rs::transport::auth_header;
///
/// let header = auth_header("public", "secret", 1_400_000_000);
/// assert!(header.starts_with("Sentry sentry_version=3,sentry_client=raven-rs/3."));
/// assert!(header.contains(",sentry_timestamp=1400000000,sentry_key=public,sentry_secret=secret,"));
/// ```
pub fn auth_header(public_key: &str, secret_key: &str, timestamp: i64) -> String {
    format!(
        "Sentry sentry_version={SENTRY_PROTOCOL_VERSION},sentry_client={USER_AGENT},\
         sentry_timestamp={timestamp},sentry_key={public_key},sentry_secret={secret_key},\
         sentry_signature={}",
        signature(public_key, secret_key, timestamp)
    )
}

fn signature(public_key: &str, secret_key: &str, timestamp: i64) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret_key.as_bytes()) else {
        return String::new();
    };
    mac.update(format!("{timestamp} {public_key}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

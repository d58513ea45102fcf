//! UDP transport: one datagram per event, no response.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use chrono::Utc;

use super::{Transport, TransportError, auth_header};
use crate::dsn::Dsn;
use crate::event::Event;
use crate::marshaller::Marshaller;

/// Port used when the DSN names none.
pub const DEFAULT_UDP_PORT: u16 = 9001;

/// Sends `auth line + "\n\n" + body` as a single datagram.
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    public_key: String,
    secret_key: String,
    marshaller: Arc<dyn Marshaller>,
}

impl UdpTransport {
    /// Resolve the DSN's host and bind a local socket.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the host does not resolve or the
    /// socket cannot be bound.
    pub fn new(dsn: &Dsn, marshaller: Arc<dyn Marshaller>) -> Result<Self, TransportError> {
        let port = dsn.port().unwrap_or(DEFAULT_UDP_PORT);
        let target = (dsn.host(), port).to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}:{port}", dsn.host()),
            )
        })?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(target)?;
        Ok(Self {
            socket,
            target,
            public_key: dsn.public_key().to_owned(),
            secret_key: dsn.secret_key().to_owned(),
            marshaller,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Transport for UdpTransport {
    fn send(&self, event: &Event) -> Result<(), TransportError> {
        let auth = auth_header(&self.public_key, &self.secret_key, Utc::now().timestamp());
        let mut datagram = Vec::with_capacity(auth.len() + 1024);
        datagram.extend_from_slice(auth.as_bytes());
        datagram.extend_from_slice(b"\n\n");
        self.marshaller.marshall(event, &mut datagram)?;
        self.socket.send(&datagram)?;
        Ok(())
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("target", &self.target)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

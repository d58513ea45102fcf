//! HTTP(S) transport posting events to the store endpoint.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, warn};
use native_tls::TlsConnector;
use ureq::{Agent, AgentBuilder};

use super::{Transport, TransportError, USER_AGENT, auth_header};
use crate::dsn::Dsn;
use crate::event::Event;
use crate::marshaller::Marshaller;

/// Default connect and read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Timeout for connecting and for reading the response.
    pub timeout: Duration,
    /// Accept certificates issued for a different host name. Certificates
    /// must still chain to a trusted root. Only the `naive` protocol setting
    /// turns this on.
    pub bypass_security: bool,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            bypass_security: false,
        }
    }
}

/// Sends each event as one `POST` to `<endpoint>api/<project>/store/`.
///
/// Connections are not pooled; every send opens a fresh one.
pub struct HttpTransport {
    agent: Agent,
    store_url: String,
    public_key: String,
    secret_key: String,
    marshaller: Arc<dyn Marshaller>,
}

impl HttpTransport {
    /// Create a transport for `dsn`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the TLS connector cannot be built.
    pub fn new(
        dsn: &Dsn,
        marshaller: Arc<dyn Marshaller>,
        config: HttpTransportConfig,
    ) -> Result<Self, TransportError> {
        let connector = tls_connector(config.bypass_security)?;
        let agent = AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout_read(config.timeout)
            .max_idle_connections(0)
            .tls_connector(Arc::new(connector))
            .build();
        Ok(Self {
            agent,
            store_url: store_url(dsn),
            public_key: dsn.public_key().to_owned(),
            secret_key: dsn.secret_key().to_owned(),
            marshaller,
        })
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }
}

/// Store endpoint of the project named by `dsn`.
pub fn store_url(dsn: &Dsn) -> String {
    format!("{}api/{}/store/", dsn.endpoint(), dsn.project_id())
}

/// Which TLS checks a connector skips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TlsRelaxation {
    hostnames: bool,
}

impl TlsRelaxation {
    fn for_bypass(bypass_security: bool) -> Self {
        Self {
            hostnames: bypass_security,
        }
    }
}

fn tls_connector(bypass_security: bool) -> io::Result<TlsConnector> {
    let relaxation = TlsRelaxation::for_bypass(bypass_security);
    let mut builder = TlsConnector::builder();
    if relaxation.hostnames {
        warn!("TLS host name verification is disabled");
        builder.danger_accept_invalid_hostnames(true);
    }
    builder.build().map_err(io::Error::other)
}

impl Transport for HttpTransport {
    fn send(&self, event: &Event) -> Result<(), TransportError> {
        let body = self.marshaller.to_vec(event)?;
        let auth = auth_header(&self.public_key, &self.secret_key, Utc::now().timestamp());
        let result = self
            .agent
            .post(&self.store_url)
            .set("User-Agent", USER_AGENT)
            .set("X-Sentry-Auth", &auth)
            .set("Content-Type", self.marshaller.content_type())
            .send_bytes(&body);
        match result {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, response)) => {
                let detail = response.into_string().unwrap_or_default();
                if detail.trim().is_empty() {
                    return Err(TransportError::ServerStatus { status });
                }
                // A rejection the server explained is reported, not raised.
                error!(
                    "event {} rejected by server ({status}): {}",
                    event.id().simple(),
                    detail.trim()
                );
                Ok(())
            }
            Err(ureq::Error::Transport(err)) => {
                Err(TransportError::Io(io::Error::other(err.to_string())))
            }
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("store_url", &self.store_url)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

//! Helpers shared by unit and integration tests.
//!
//! Compiled for this crate's own tests and, through the `test-util`
//! feature, for the integration tests under `tests/`.

mod recording_transport;

use std::sync::Arc;
use std::time::Duration;

pub use recording_transport::RecordingTransport;

use crate::event::{Event, EventBuilder, HostnameCache};

/// Host name returned by [`fixed_hostname_cache`].
pub const TEST_HOSTNAME: &str = "test-host";

/// Cache that resolves to [`TEST_HOSTNAME`] without touching the system.
pub fn fixed_hostname_cache() -> Arc<HostnameCache> {
    Arc::new(HostnameCache::with_resolver(
        || Some(TEST_HOSTNAME.to_owned()),
        Duration::from_secs(3600),
        Duration::from_secs(5),
    ))
}

/// Builder wired to [`fixed_hostname_cache`].
pub fn test_builder() -> EventBuilder {
    EventBuilder::new().with_hostname_cache(fixed_hostname_cache())
}

/// Build an event carrying only `message`.
pub fn sample_event(message: &str) -> Event {
    let mut builder = test_builder();
    builder.set_message(message);
    match builder.build() {
        Ok(event) => event,
        Err(err) => panic!("fresh builder failed: {err}"),
    }
}

//! Process-wide cache of the local host name.
//!
//! Host name resolution can block for a long time on a misconfigured
//! resolver. One background thread performs every lookup; callers wait at
//! most the configured timeout and fall back to [`DEFAULT_HOSTNAME`].

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, TrySendError, bounded};
use log::{debug, warn};
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};

/// Returned when no host name could be resolved in time.
pub const DEFAULT_HOSTNAME: &str = "unavailable";
/// Longest a caller waits for a pending resolution.
pub const DEFAULT_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(1);
/// How long a resolved name stays fresh.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(5 * 60 * 60);

type Resolver = Box<dyn Fn() -> Option<String> + Send + Sync>;

static GLOBAL: Lazy<Arc<HostnameCache>> = Lazy::new(|| Arc::new(HostnameCache::new()));

#[derive(Default)]
struct CacheState {
    value: Option<String>,
    expires_at: Option<Instant>,
    resolving: bool,
}

struct Shared {
    state: Mutex<CacheState>,
    resolved: Condvar,
}

/// Cached host name with a single background resolver.
///
/// After the cached name expires, callers keep receiving the stale name
/// while a refresh runs.
pub struct HostnameCache {
    shared: Arc<Shared>,
    requests: Option<Sender<()>>,
    resolution_timeout: Duration,
}

impl HostnameCache {
    /// Cache resolving the operating system's host name with default timings.
    pub fn new() -> Self {
        Self::with_resolver(
            system_hostname,
            DEFAULT_CACHE_DURATION,
            DEFAULT_RESOLUTION_TIMEOUT,
        )
    }

    /// Cache backed by a custom resolver.
    pub fn with_resolver<F>(resolver: F, cache_duration: Duration, resolution_timeout: Duration) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(CacheState::default()),
            resolved: Condvar::new(),
        });
        let requests = spawn_resolver(Box::new(resolver), Arc::clone(&shared), cache_duration);
        Self {
            shared,
            requests,
            resolution_timeout,
        }
    }

    /// The shared process-wide cache.
    pub fn global() -> Arc<HostnameCache> {
        Arc::clone(&GLOBAL)
    }

    /// Current host name, waiting at most the resolution timeout.
    pub fn hostname(&self) -> String {
        let deadline = Instant::now() + self.resolution_timeout;
        let mut state = self.shared.state.lock();
        let fresh = state.expires_at.is_some_and(|at| Instant::now() < at);
        if let Some(value) = state.value.clone() {
            if !fresh {
                self.request_refresh(&mut state);
            }
            return value;
        }
        self.request_refresh(&mut state);
        while state.value.is_none() && state.resolving {
            if self
                .shared
                .resolved
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }
        state
            .value
            .clone()
            .unwrap_or_else(|| DEFAULT_HOSTNAME.to_owned())
    }

    fn request_refresh(&self, state: &mut CacheState) {
        if state.resolving {
            return;
        }
        let Some(tx) = self.requests.as_ref() else {
            return;
        };
        match tx.try_send(()) {
            Ok(()) => state.resolving = true,
            Err(TrySendError::Full(())) => state.resolving = true,
            Err(TrySendError::Disconnected(())) => {
                debug!("host name resolver is not running");
            }
        }
    }
}

impl Default for HostnameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HostnameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("HostnameCache")
            .field("value", &state.value)
            .field("resolving", &state.resolving)
            .field("resolution_timeout", &self.resolution_timeout)
            .finish()
    }
}

fn spawn_resolver(
    resolver: Resolver,
    shared: Arc<Shared>,
    cache_duration: Duration,
) -> Option<Sender<()>> {
    let (tx, rx) = bounded::<()>(1);
    let spawned = thread::Builder::new()
        .name("raven-hostname".into())
        .spawn(move || {
            // Exits once the owning cache drops its sender.
            while rx.recv().is_ok() {
                let resolved = resolver();
                let mut state = shared.state.lock();
                match resolved {
                    Some(name) => {
                        state.value = Some(name);
                        state.expires_at = Some(Instant::now() + cache_duration);
                    }
                    None => debug!("host name resolution returned nothing"),
                }
                state.resolving = false;
                shared.resolved.notify_all();
            }
        });
    match spawned {
        Ok(_) => Some(tx),
        Err(err) => {
            warn!("failed to spawn host name resolver: {err}");
            None
        }
    }
}

fn system_hostname() -> Option<String> {
    hostname::get().ok()?.into_string().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn returns_resolved_name() {
        let cache = HostnameCache::with_resolver(
            || Some("web-1".to_owned()),
            DEFAULT_CACHE_DURATION,
            Duration::from_secs(5),
        );
        assert_eq!(cache.hostname(), "web-1");
    }

    #[test]
    fn falls_back_when_resolution_is_slow() {
        let cache = HostnameCache::with_resolver(
            || {
                thread::sleep(Duration::from_millis(500));
                Some("late".to_owned())
            },
            DEFAULT_CACHE_DURATION,
            Duration::from_millis(20),
        );
        assert_eq!(cache.hostname(), DEFAULT_HOSTNAME);
    }

    #[test]
    fn late_resolution_is_kept_for_later_callers() {
        let cache = HostnameCache::with_resolver(
            || {
                thread::sleep(Duration::from_millis(300));
                Some("late".to_owned())
            },
            DEFAULT_CACHE_DURATION,
            Duration::from_millis(100),
        );
        let started = Instant::now();
        assert_eq!(cache.hostname(), DEFAULT_HOSTNAME);
        assert!(started.elapsed() < Duration::from_millis(250));

        thread::sleep(Duration::from_millis(400));
        let started = Instant::now();
        assert_eq!(cache.hostname(), "late");
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn falls_back_when_resolver_fails() {
        let cache =
            HostnameCache::with_resolver(|| None, DEFAULT_CACHE_DURATION, Duration::from_secs(5));
        assert_eq!(cache.hostname(), DEFAULT_HOSTNAME);
    }

    #[test]
    fn caches_fresh_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = HostnameCache::with_resolver(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Some("db-2".to_owned())
            },
            DEFAULT_CACHE_DURATION,
            Duration::from_secs(5),
        );
        for _ in 0..5 {
            assert_eq!(cache.hostname(), "db-2");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn serves_stale_value_while_refreshing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = HostnameCache::with_resolver(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n > 0 {
                    thread::sleep(Duration::from_millis(200));
                }
                Some(format!("host-{n}"))
            },
            Duration::ZERO,
            Duration::from_secs(5),
        );
        assert_eq!(cache.hostname(), "host-0");
        // Expired immediately: the stale name is returned without waiting.
        let started = Instant::now();
        assert_eq!(cache.hostname(), "host-0");
        assert!(started.elapsed() < Duration::from_millis(150));
    }
}

//! Rate limiting for "dropped event" warnings.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Default minimum spacing between two drop warnings.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

fn now_millis() -> u64 {
    u64::try_from(EPOCH.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Counts dropped events and reports them at most once per interval.
///
/// Callers bump the counter with [`record_drop`](Self::record_drop) and then
/// call [`warn_if_due`](Self::warn_if_due), which invokes the callback with
/// the number of drops since the last report once the interval has elapsed.
/// The first report is never delayed.
#[derive(Debug)]
pub struct RateLimitedWarner {
    interval_ms: u64,
    last_warn_ms: AtomicU64,
    warned_once: AtomicBool,
    pending: AtomicU64,
    total: AtomicU64,
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl RateLimitedWarner {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            last_warn_ms: AtomicU64::new(0),
            warned_once: AtomicBool::new(false),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    pub fn record_drop(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of drops recorded over the warner's lifetime.
    pub fn dropped_total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Report pending drops if the interval has elapsed since the last
    /// report.
    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        let now = now_millis();
        let first = !self.warned_once.load(Ordering::Acquire);
        let prev = self.last_warn_ms.load(Ordering::Acquire);
        if !first && now.saturating_sub(prev) < self.interval_ms {
            return;
        }
        // Only one caller wins the slot for this interval.
        if self
            .last_warn_ms
            .compare_exchange(prev, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.warned_once.store(true, Ordering::Release);
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
        }
    }

    /// Report pending drops immediately.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            self.last_warn_ms.store(now_millis(), Ordering::Release);
            self.warned_once.store(true, Ordering::Release);
            warn(count);
        }
    }
}

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use log::trace;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

use super::HostKey;

/// Source of the random part of a rate-limit wait.
///
/// Implementations return an offset uniformly distributed in
/// `[0, window)`; the limiter shifts it by `-window/2` to get a jitter term in
/// `[-window/2, +window/2)`.
pub trait JitterSource: Send + Sync {
    /// Draw an offset in `[0, window)`. A zero window yields zero.
    fn offset(&self, window: Duration) -> Duration;
}

/// Uniformly distributed jitter from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn offset(&self, window: Duration) -> Duration {
        let nanos = u64::try_from(window.as_nanos()).unwrap_or(u64::MAX);
        if nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::rng().random_range(0..nanos))
    }
}

/// Timestamp of the last request dispatched to a host.
/// `None` until the first request went out.
type LastDispatch = Arc<Mutex<Option<Instant>>>;

/// Per-host gate enforcing a jittered minimum spacing between requests to
/// the same host.
///
/// Each host has its own lock which is held while waiting, so workers
/// targeting the same host queue up behind each other while workers for other
/// hosts are unaffected.
pub struct HostRateLimiter {
    interval: Duration,
    hosts: DashMap<HostKey, LastDispatch>,
    jitter: Box<dyn JitterSource>,
}

impl HostRateLimiter {
    /// Create a limiter with the given nominal interval.
    /// A zero interval disables rate limiting.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::with_jitter(interval, RandomJitter)
    }

    /// Create a limiter drawing its jitter from `jitter`
    #[must_use]
    pub fn with_jitter(interval: Duration, jitter: impl JitterSource + 'static) -> Self {
        Self {
            interval,
            hosts: DashMap::new(),
            jitter: Box::new(jitter),
        }
    }

    /// A limiter which never waits
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The configured nominal interval
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` if requests are spaced at all
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Number of distinct hosts seen so far
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Wait until a request to `host` may be dispatched, then record the
    /// dispatch time.
    ///
    /// The first request to a host passes immediately. Afterwards the
    /// remaining part of the interval, `max(0, interval - elapsed)`, is
    /// shifted by a `jitter` drawn uniformly from `[-interval/2, +interval/2)`
    /// and clamped at zero again. A host idle for longer than the interval
    /// may therefore still wait up to half an interval.
    pub async fn gate(&self, host: &HostKey) {
        if !self.is_enabled() {
            return;
        }

        // Clone the per-host slot out of the map so no shard lock is held
        // across the await below
        let slot = Arc::clone(self.hosts.entry(host.clone()).or_default().value());

        let mut last = slot.lock().await;
        if let Some(previous) = *last {
            let wait = self.wait_after(previous.elapsed());
            if !wait.is_zero() {
                trace!("Delaying request to {host} by {}ms", wait.as_millis());
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn wait_after(&self, elapsed: Duration) -> Duration {
        // base = max(0, interval - elapsed); wait = max(0, base + offset - interval/2)
        let base = self.interval.saturating_sub(elapsed);
        let offset = self.jitter.offset(self.interval);
        (base + offset).saturating_sub(self.interval / 2)
    }
}

impl fmt::Debug for HostRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRateLimiter")
            .field("interval", &self.interval)
            .field("hosts", &self.hosts.len())
            .finish_non_exhaustive()
    }
}

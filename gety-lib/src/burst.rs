//! Burst throttling of the submission loop.
//!
//! Independent of per-host rate limiting, the throttle pauses the submission
//! of new work for a cooldown after every `size` submissions.

use std::time::Duration;

/// Counter deciding when the submission loop has to pause.
///
/// Used only by the single submission loop, so no synchronization is needed.
/// The pause is taken lazily: it is due when a further submission arrives
/// after `size` submissions, never after the final one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstThrottle {
    size: usize,
    cooldown: Duration,
    count: usize,
}

impl BurstThrottle {
    /// Create a throttle pausing for `cooldown` after every `size` submissions.
    ///
    /// A zero `size` or a zero `cooldown` disables throttling.
    #[must_use]
    pub const fn new(size: usize, cooldown: Duration) -> Self {
        Self {
            size,
            cooldown,
            count: 0,
        }
    }

    /// A throttle which never pauses
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Returns `true` if the throttle ever pauses
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.size > 0 && !self.cooldown.is_zero()
    }

    /// Number of submissions per burst
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// The configured cooldown
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Number of submissions since the last cooldown
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Register the next submission.
    ///
    /// Returns the cooldown the caller must wait for before submitting,
    /// or `None` if it may submit right away.
    pub fn register(&mut self) -> Option<Duration> {
        let pause = if self.is_enabled() && self.count >= self.size {
            self.count = 0;
            Some(self.cooldown)
        } else {
            None
        };
        self.count += 1;
        pause
    }
}

impl Default for BurstThrottle {
    fn default() -> Self {
        Self::disabled()
    }
}

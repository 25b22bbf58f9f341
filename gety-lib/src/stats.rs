use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Summary of a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Items handed to the dispatcher
    pub submitted: usize,
    /// Items which passed all filters and were reported
    pub reported: usize,
    /// Items which got a response but were dropped by a filter
    pub filtered: usize,
    /// Items which failed at some stage
    pub failed: usize,
}

impl Stats {
    /// Number of items which have finished, one way or another
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.reported + self.filtered + self.failed
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} submitted, {} reported, {} filtered out, {} failed",
            self.submitted, self.reported, self.filtered, self.failed
        )
    }
}

/// Counters updated concurrently by the workers of a run
#[derive(Debug, Default)]
pub(crate) struct Counters {
    submitted: AtomicUsize,
    reported: AtomicUsize,
    filtered: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    pub(crate) fn submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reported(&self) {
        self.reported.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            submitted: self.submitted.load(Ordering::Relaxed),
            reported: self.reported.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

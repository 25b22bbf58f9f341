//! Bounded dispatch of work items.
//!
//! The [`Dispatcher`] caps the number of tasks in flight with a semaphore and
//! tracks their completion with a [`WaitGroup`]. Each task owns its permit
//! and its guard, so both are released on every exit path.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{error, trace};
use tokio::sync::Semaphore;

use crate::waiter::{WaitGroup, WaitGuard};
use crate::{ErrorKind, Result};

/// A worker pool with a fixed number of slots.
///
/// [`Dispatcher::submit`] waits for a free slot and then runs the given work
/// as its own task. [`Dispatcher::drain_and_wait`] waits until everything
/// submitted so far has finished.
#[derive(Debug)]
pub struct Dispatcher {
    limit: usize,
    slots: Arc<Semaphore>,
    waiter: WaitGroup,
    guard: WaitGuard,
}

impl Dispatcher {
    /// Create a dispatcher running at most `limit` tasks at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ZeroConcurrency`] if `limit` is zero.
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(ErrorKind::ZeroConcurrency);
        }
        let (waiter, guard) = WaitGroup::new();
        Ok(Self {
            limit,
            slots: Arc::new(Semaphore::new(limit)),
            waiter,
            guard,
        })
    }

    /// The maximum number of tasks in flight
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number of slots currently held by running tasks
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.limit - self.slots.available_permits()
    }

    /// Wait for a free slot, then spawn `work`.
    ///
    /// Returns as soon as the work has been spawned. A panic inside `work` is
    /// logged and releases the slot like a regular completion.
    pub async fn submit<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.slots).acquire_owned().await else {
            // The semaphore is owned by `self` and never closed
            return;
        };
        let guard = self.guard.clone();

        tokio::spawn(async move {
            if AssertUnwindSafe(work).catch_unwind().await.is_err() {
                error!("A work item panicked; continuing with the remaining items");
            }
            drop(permit);
            drop(guard);
        });
        trace!("Submitted work item ({} in flight)", self.in_flight());
    }

    /// Wait until every submitted task has completed.
    pub async fn drain_and_wait(self) {
        let Self { waiter, guard, .. } = self;
        drop(guard);
        waiter.wait().await;
    }
}

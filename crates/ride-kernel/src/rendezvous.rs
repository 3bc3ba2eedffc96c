//! Counting rendezvous primitive (wait/signal).
//!
//! A signed counter guarded by its own lock. `signal` never blocks; a signal
//! with nobody waiting is absorbed into the counter. A negative value is the
//! number of callers currently parked in `wait`.
//!
//! Wake-ups are handed out as permits of a [`Semaphore`] that is never closed.
//! A permit added before its waiter gets around to parking stays in the
//! semaphore, so no wake-up is lost between releasing the counter lock and
//! suspending.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug)]
pub struct RendezvousCounter {
    name: &'static str,
    value: Mutex<i64>,
    wakeups: Semaphore,
}

impl RendezvousCounter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            value: Mutex::new(0),
            wakeups: Semaphore::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current counter value. Negative means that many callers are parked.
    pub fn value(&self) -> i64 {
        *self.lock()
    }

    /// Increment, waking exactly one parked waiter if there is one.
    pub fn signal(&self) {
        let mut value = self.lock();
        *value += 1;
        if *value <= 0 {
            self.wakeups.add_permits(1);
        }
        trace!(counter = self.name, value = *value, "signal");
    }

    /// Decrement, suspending until a matching `signal` if the result is negative.
    pub async fn wait(&self) {
        if self.decrement() >= 0 {
            return;
        }
        self.park().await;
    }

    /// Like [`wait`](Self::wait), but gives up when `closed` fires.
    ///
    /// Returns `false` if the wait was abandoned. Abandoning leaves the
    /// counter decremented: the token is only fired once the session is over
    /// and nothing signals this counter again.
    pub async fn wait_or_cancelled(&self, closed: &CancellationToken) -> bool {
        if self.decrement() >= 0 {
            return true;
        }
        tokio::select! {
            biased;
            _ = self.park() => true,
            _ = closed.cancelled() => {
                trace!(counter = self.name, "wait abandoned, session closed");
                false
            }
        }
    }

    fn decrement(&self) -> i64 {
        let mut value = self.lock();
        *value -= 1;
        trace!(counter = self.name, value = *value, "wait");
        *value
    }

    async fn park(&self) {
        // The semaphore is owned by `self` and never closed, so acquire only
        // fails if that changes.
        if let Ok(permit) = self.wakeups.acquire().await {
            permit.forget();
        }
    }

    fn lock(&self) -> MutexGuard<'_, i64> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

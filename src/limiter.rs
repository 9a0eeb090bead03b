//! Global bound on in-flight backend I/O
//!
//! The walk still creates one future per child at every level, but each of
//! them has to hold a [`Permit`] while it talks to a backend. Permits are
//! only held across a single backend step (stat, list, ensure, one file
//! copy) and never while waiting for another permit, so a small bound can
//! not deadlock a deep tree.
//!
//! Waiting is delegated to [`async_lock::Semaphore`]. A pending acquire owns
//! exactly one listener slot, no matter how often the surrounding join polls
//! it, and gives the slot back when it is dropped.

use async_lock::{Semaphore, SemaphoreGuardArc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Async counting semaphore with FIFO waiters and peak tracking
#[derive(Clone)]
pub struct FanOutLimiter {
    inner: Arc<LimiterInner>,
}

struct LimiterInner {
    limit: usize,
    semaphore: Arc<Semaphore>,
    counts: Mutex<Counts>,
}

#[derive(Default)]
struct Counts {
    in_flight: usize,
    peak: usize,
}

impl FanOutLimiter {
    /// Create a limiter allowing `limit` concurrent permits
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0; settings validation rejects that earlier
    #[must_use]
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "FanOutLimiter must allow at least one permit");
        Self {
            inner: Arc::new(LimiterInner {
                limit,
                semaphore: Arc::new(Semaphore::new(limit)),
                counts: Mutex::new(Counts::default()),
            }),
        }
    }

    /// Wait for a permit
    pub async fn acquire(&self) -> Permit {
        let guard = self.inner.semaphore.acquire_arc().await;
        self.track(guard)
    }

    /// Take a permit if one is free right now
    #[must_use]
    pub fn try_acquire(&self) -> Option<Permit> {
        self.inner
            .semaphore
            .try_acquire_arc()
            .map(|guard| self.track(guard))
    }

    /// Configured bound
    #[must_use]
    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Permits currently held
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Highest number of permits ever held at once
    #[must_use]
    pub fn peak(&self) -> usize {
        self.lock().peak
    }

    fn lock(&self) -> MutexGuard<'_, Counts> {
        self.inner.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, guard: SemaphoreGuardArc) -> Permit {
        let mut counts = self.lock();
        counts.in_flight += 1;
        counts.peak = counts.peak.max(counts.in_flight);
        Permit {
            limiter: self.clone(),
            _guard: guard,
        }
    }
}

/// RAII guard; the permit returns to the limiter on drop
pub struct Permit {
    limiter: FanOutLimiter,
    _guard: SemaphoreGuardArc,
}

impl Drop for Permit {
    fn drop(&mut self) {
        // Runs before `_guard` hands the slot back, so counts never exceed the bound
        self.limiter.lock().in_flight -= 1;
    }
}

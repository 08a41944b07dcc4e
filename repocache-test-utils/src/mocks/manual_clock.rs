//! Hand-driven clock for testing

use repocache_core::Clock;
use std::sync::atomic::{AtomicU64, Ordering};

/// [`Clock`] that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now_millis: AtomicU64,
}

impl ManualClock {
    /// Clock reading `start_millis`
    pub fn new(start_millis: u64) -> Self {
        Self {
            now_millis: AtomicU64::new(start_millis),
        }
    }

    pub fn set(&self, now_millis: u64) {
        self.now_millis.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now_millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now_millis.load(Ordering::SeqCst)
    }
}

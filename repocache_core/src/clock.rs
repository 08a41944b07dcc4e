//! Time source for freshness decisions
//!
//! The engine reads the current time when a persist is scheduled (the new
//! marker mtime) and when freshness is checked. Both reads go through a
//! [`Clock`] so hosts and tests can pin time.

use crate::file_store::now_millis;

/// Source of wall-clock time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// [`Clock`] backed by `SystemTime::now`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_tracks_wall_time() {
        let before = now_millis();
        let reading = SystemClock.now_millis();
        let after = now_millis();

        assert!(before <= reading && reading <= after);
    }
}

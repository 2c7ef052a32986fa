//! Timestamp sources.
//!
//! Grounded on `core/clock.rs` in the teacher: a small `Clock` trait lets
//! callers swap wall-clock time for a monotonic, TSC-anchored clock without
//! touching call sites. The provider heartbeat monitor (§4.G) wants the
//! latter — monotonic ticks read through an `AtomicU64`, never a lock.

use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync + 'static {
    /// Nanoseconds since the UNIX epoch.
    fn now_ns(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX epoch")
            .as_nanos() as u64
    }
}

/// Monotonic clock anchored to wall-clock time at construction, then
/// advanced with TSC ticks. Never jumps backward; suitable for heartbeat
/// deadlines where NTP step corrections would otherwise cause spurious
/// reconnects.
#[derive(Debug, Clone)]
pub struct QuantaClock {
    clock: quanta::Clock,
    start_wall_ns: u64,
    start_instant: quanta::Instant,
}

impl Default for QuantaClock {
    fn default() -> Self {
        let clock = quanta::Clock::new();
        let start_instant = clock.now();
        let start_wall_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX epoch")
            .as_nanos() as u64;
        Self {
            clock,
            start_wall_ns,
            start_instant,
        }
    }
}

impl QuantaClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for QuantaClock {
    fn now_ns(&self) -> u64 {
        let delta = self.clock.now().duration_since(self.start_instant);
        self.start_wall_ns + delta.as_nanos() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now_ns();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let b = clock.now_ns();
        assert!(b > a);
    }

    #[test]
    fn quanta_clock_advances_monotonically() {
        let clock = QuantaClock::new();
        let a = clock.now_ns();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let b = clock.now_ns();
        assert!(b >= a);
    }
}

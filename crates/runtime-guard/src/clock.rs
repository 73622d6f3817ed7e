//! Time source used by the cache, the timing probe and the monitor loop.
//!
//! Production code runs on [`MonotonicClock`]. [`ManualClock`] lets tests
//! drive TTL expiry and monitor iterations without wall-clock delay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::monitor::StopSignal;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);

    /// Sleeps for `duration` unless `stop` fires first.
    fn sleep_unless_stopped(&self, duration: Duration, _stop: &StopSignal) {
        self.sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn sleep_unless_stopped(&self, duration: Duration, stop: &StopSignal) {
        stop.wait_timeout(duration);
    }
}

/// Virtual clock that only moves when told to.
///
/// `sleep` advances virtual time instead of blocking and remembers the last
/// requested duration. `with_step_on_read` makes every `now()` call advance
/// time by a fixed step, which lets tests inflate bracketed measurements.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
    step_on_read: Duration,
    last_sleep: Mutex<Option<Duration>>,
    sleep_count: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::with_step_on_read(Duration::ZERO)
    }

    pub fn with_step_on_read(step: Duration) -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            step_on_read: step,
            last_sleep: Mutex::new(None),
            sleep_count: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset = offset.saturating_add(duration);
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_sleep(&self) -> Option<Duration> {
        *self.last_sleep.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sleep_count(&self) -> u64 {
        self.sleep_count.load(Ordering::Acquire)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.origin + *offset;
        *offset = offset.saturating_add(self.step_on_read);
        now
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        *self.last_sleep.lock().unwrap_or_else(PoisonError::into_inner) = Some(duration);
        self.sleep_count.fetch_add(1, Ordering::AcqRel);
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_sleep_advances_virtual_time() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_millis(300));
        assert_eq!(clock.now() - start, Duration::from_millis(300));
        assert_eq!(clock.last_sleep(), Some(Duration::from_millis(300)));
        assert_eq!(clock.sleep_count(), 1);
    }

    #[test]
    fn step_on_read_inflates_successive_reads() {
        let clock = ManualClock::with_step_on_read(Duration::from_millis(7));
        let first = clock.now();
        let second = clock.now();
        assert_eq!(second - first, Duration::from_millis(7));
    }
}

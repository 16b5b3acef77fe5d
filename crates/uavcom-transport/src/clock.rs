use std::cell::Cell;
use std::time::Instant;

use crate::traits::Clock;

/// Wall-clock backed monotonic time, origin at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Manually advanced clock for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now: Cell::new(start_us),
        }
    }

    /// Move time forward by `delta_us`.
    pub fn advance(&self, delta_us: u64) {
        self.now.set(self.now.get().saturating_add(delta_us));
    }

    pub fn set(&self, now_us: u64) {
        self.now.set(now_us);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(10);
        clock.advance(1_000);
        assert_eq!(clock.now_us(), 1_010);
        clock.set(5);
        assert_eq!(clock.now_us(), 5);
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(b >= a);
    }
}

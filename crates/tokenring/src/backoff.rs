use std::hint;
use std::thread;
use std::time::Duration;

/// Adaptive backoff for polling waits (Crossbeam-style).
///
/// Progressively increases wait time: spin with PAUSE → yield to OS → sleep,
/// with the sleep doubling up to [`Backoff::MAX_SLEEP`].
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding
    const YIELD_LIMIT: u32 = 10; // Then start sleeping
    const MAX_SLEEP: Duration = Duration::from_millis(8);

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Waits a little longer than last time.
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..1 << self.step {
                hint::spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
        } else {
            thread::sleep(self.sleep_for());
        }
        self.step = self.step.saturating_add(1);
    }

    /// Returns `true` once spinning and yielding are exhausted and each
    /// snooze sleeps.
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }

    fn sleep_for(&self) -> Duration {
        let exp = (self.step - Self::YIELD_LIMIT - 1).min(3);
        (Duration::from_millis(1) * (1 << exp)).min(Self::MAX_SLEEP)
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut b = Backoff::new();
        assert_eq!(b.step, 0);

        b.snooze();
        assert!(b.step > 0);

        while !b.is_sleeping() {
            b.snooze();
        }
        assert_eq!(b.sleep_for(), Duration::from_millis(1));
        for _ in 0..10 {
            b.snooze();
        }
        assert_eq!(b.sleep_for(), Backoff::MAX_SLEEP);

        b.reset();
        assert_eq!(b.step, 0);
    }
}

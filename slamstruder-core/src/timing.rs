//! Control loop timing
//!
//! The heater loop is polled far more often than it needs to run. A
//! [`LoopGate`] turns those polls into a fixed-rate schedule against a
//! monotonic microsecond clock.

/// Elapsed-time gate for a periodic control step
///
/// When a step is due the mark advances by exactly one period instead of
/// jumping to `now`, so late polls are made up for and the average rate
/// stays at one step per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoopGate {
    period_us: u64,
    mark_us: u64,
}

impl LoopGate {
    /// Create a gate whose first period starts at `now_us`
    pub const fn new(period_us: u32, now_us: u64) -> Self {
        Self {
            period_us: period_us as u64,
            mark_us: now_us,
        }
    }

    /// Restart the schedule from `now_us`
    pub fn reset(&mut self, now_us: u64) {
        self.mark_us = now_us;
    }

    /// Period in microseconds
    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    /// Time since the current period started
    pub fn elapsed_us(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.mark_us)
    }

    /// Check whether a step is due, consuming one period if so
    ///
    /// Non-blocking; returns `false` immediately when it is too early.
    pub fn poll(&mut self, now_us: u64) -> bool {
        if self.elapsed_us(now_us) > self.period_us {
            self.mark_us += self.period_us;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_not_due_before_period() {
        let mut gate = LoopGate::new(10_000, 0);
        assert!(!gate.poll(0));
        assert!(!gate.poll(5_000));
        // Strictly greater than one period
        assert!(!gate.poll(10_000));
        assert!(gate.poll(10_001));
        assert!(!gate.poll(10_002));
    }

    #[test]
    fn test_mark_advances_by_period() {
        let mut gate = LoopGate::new(10_000, 0);
        assert!(gate.poll(13_000));
        // Mark is now 10_000, not 13_000
        assert_eq!(gate.elapsed_us(13_000), 3_000);
        assert!(gate.poll(20_001));
    }

    #[test]
    fn test_late_poll_catches_up() {
        let mut gate = LoopGate::new(10_000, 0);
        // Poller stalled for 35ms: three periods are owed
        let mut steps = 0;
        while gate.poll(35_000) {
            steps += 1;
        }
        assert_eq!(steps, 3);
    }

    #[test]
    fn test_average_rate_with_irregular_polls() {
        let mut gate = LoopGate::new(10_000, 0);
        let mut steps = 0;
        let mut now = 0u64;
        // Jittery polling between 1 and 7 ms
        for i in 0..2_000u64 {
            now += 1_000 + (i * 37 % 6) * 1_000;
            if gate.poll(now) {
                steps += 1;
            }
        }
        let expected = now / 10_000;
        assert!(steps as u64 <= expected);
        assert!(steps as u64 + 2 >= expected);
    }

    #[test]
    fn test_reset() {
        let mut gate = LoopGate::new(1_000, 0);
        gate.reset(50_000);
        assert!(!gate.poll(50_500));
        assert!(gate.poll(51_001));
    }

    proptest! {
        #[test]
        fn prop_steps_bounded_by_elapsed_periods(
            period in 100u32..50_000,
            gaps in prop::collection::vec(0u64..100_000, 1..100),
        ) {
            let mut gate = LoopGate::new(period, 0);
            let mut now = 0u64;
            let mut steps = 0u64;
            for gap in gaps {
                now += gap;
                while gate.poll(now) {
                    steps += 1;
                }
            }
            prop_assert!(steps <= now / u64::from(period));
            // Nothing owed once drained
            prop_assert!(gate.elapsed_us(now) <= u64::from(period));
        }
    }
}

//! Step pulse generation
//!
//! A periodic timer toggles the step line once per half-period, so a full
//! step (one rising edge) takes `2 * half_period_us`. The step interval is
//! published through [`StepTiming`], which is shared between the control
//! context (writer) and the timer context (reader).

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use slamstruder_core::traits::StepTimer;

/// Step timing shared with the timer context
///
/// Word-sized atomics: the timer context never sees a torn half-period.
pub struct StepTiming {
    half_period_us: AtomicU32,
    armed: AtomicBool,
    level: AtomicBool,
    toggles: AtomicU32,
}

impl StepTiming {
    /// Create disarmed timing with the step line low
    pub const fn new() -> Self {
        Self {
            half_period_us: AtomicU32::new(0),
            armed: AtomicBool::new(false),
            level: AtomicBool::new(false),
            toggles: AtomicU32::new(0),
        }
    }

    /// Current half-period (µs)
    pub fn half_period_us(&self) -> u32 {
        self.half_period_us.load(Ordering::Acquire)
    }

    /// Check if the timer callback is allowed to toggle
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Last level written to the step line
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Relaxed)
    }

    /// Number of toggles since boot (wraps)
    pub fn toggles(&self) -> u32 {
        self.toggles.load(Ordering::Relaxed)
    }

    /// Timer callback body
    ///
    /// Toggles the step line if armed and returns the half-period until the
    /// next callback. Returns `None` without touching the pin when disarmed.
    pub fn on_timer<P: OutputPin<Error = Infallible>>(&self, step_pin: &mut P) -> Option<u32> {
        if !self.is_armed() {
            return None;
        }

        let high = !self.level.fetch_xor(true, Ordering::Relaxed);
        let result = if high {
            step_pin.set_high()
        } else {
            step_pin.set_low()
        };
        result.unwrap_or_else(|never| match never {});
        self.toggles.fetch_add(1, Ordering::Relaxed);

        Some(self.half_period_us())
    }

    fn publish(&self, half_period_us: u32) {
        self.half_period_us.store(half_period_us, Ordering::Release);
    }

    fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::Release);
    }
}

impl Default for StepTiming {
    fn default() -> Self {
        Self::new()
    }
}

/// Step pulse generator
///
/// Arms and disarms the periodic step timer. The pin itself is owned by
/// the timer context.
pub struct StepPulseGenerator<'a, T> {
    timer: T,
    timing: &'a StepTiming,
}

impl<'a, T: StepTimer> StepPulseGenerator<'a, T> {
    /// Create a disarmed generator
    pub fn new(timer: T, timing: &'a StepTiming) -> Self {
        let mut generator = Self { timer, timing };
        generator.disarm();
        generator
    }

    /// Start toggling the step line every `half_period_us`
    ///
    /// Replaces any running schedule. The half-period is published before
    /// the timer restarts, so the first callback already uses it.
    pub fn arm(&mut self, half_period_us: u32) {
        self.timer.cancel();
        self.timing.publish(half_period_us);
        self.timing.set_armed(true);
        self.timer.start(half_period_us);
    }

    /// Stop toggling
    ///
    /// The step line stays at whatever level it was last driven to.
    pub fn disarm(&mut self) {
        self.timing.set_armed(false);
        self.timer.cancel();
    }

    /// Check if the generator is armed
    pub fn is_armed(&self) -> bool {
        self.timing.is_armed()
    }

    /// Published half-period (µs)
    pub fn half_period_us(&self) -> u32 {
        self.timing.half_period_us()
    }

    /// Shared timing
    pub fn timing(&self) -> &'a StepTiming {
        self.timing
    }
}

/// Deadline of the toggle after the one due at `deadline_us`
///
/// Advances by exactly one half-period so the average step rate does not
/// drift. A runner that has fallen more than a half-period behind `now_us`
/// restarts from `now_us` instead of bursting. A zero half-period counts as
/// 1 µs.
pub fn next_deadline_us(deadline_us: u64, now_us: u64, half_period_us: u32) -> u64 {
    let step = u64::from(half_period_us.max(1));
    let next = deadline_us + step;
    if next + step < now_us {
        now_us + step
    } else {
        next
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType;

    /// Timer recording what it was asked to do
    #[derive(Default)]
    pub(crate) struct MockTimer {
        pub running: Option<u32>,
        pub starts: u32,
        pub cancels: u32,
    }

    impl StepTimer for MockTimer {
        fn start(&mut self, half_period_us: u32) {
            self.running = Some(half_period_us);
            self.starts += 1;
        }

        fn cancel(&mut self) {
            self.running = None;
            self.cancels += 1;
        }
    }

    #[derive(Default)]
    pub(crate) struct MockPin {
        pub high: bool,
        pub writes: u32,
        /// High to low transitions
        pub falls: u32,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            if self.high {
                self.falls += 1;
            }
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_deadline_advances_by_half_period() {
        assert_eq!(next_deadline_us(1_000, 1_010, 172), 1_172);
        // Slightly late: caught up without skipping
        assert_eq!(next_deadline_us(1_000, 1_300, 172), 1_172);
        assert_eq!(next_deadline_us(1_000, 1_000, 0), 1_001);
    }

    #[test]
    fn test_deadline_resyncs_when_far_behind() {
        assert_eq!(next_deadline_us(1_000, 5_000, 172), 5_172);
    }

    #[test]
    fn test_deadline_rate_does_not_drift() {
        // Runner woken up to 100 µs late every time
        let mut deadline = 0u64;
        for i in 0..1_000u64 {
            let now = deadline + (i * 37) % 100;
            deadline = next_deadline_us(deadline, now, 172);
        }
        assert_eq!(deadline, 172_000);
    }

    #[test]
    fn test_new_is_disarmed() {
        let timing = StepTiming::new();
        let generator = StepPulseGenerator::new(MockTimer::default(), &timing);
        assert!(!generator.is_armed());
        assert_eq!(generator.timer.running, None);
    }

    #[test]
    fn test_disarmed_callback_leaves_pin() {
        let timing = StepTiming::new();
        let mut pin = MockPin::default();
        assert_eq!(timing.on_timer(&mut pin), None);
        assert_eq!(pin.writes, 0);
    }

    #[test]
    fn test_armed_callback_toggles() {
        let timing = StepTiming::new();
        let mut generator = StepPulseGenerator::new(MockTimer::default(), &timing);
        let mut pin = MockPin::default();

        generator.arm(172);
        assert_eq!(generator.timer.running, Some(172));
        assert_eq!(generator.half_period_us(), 172);

        assert_eq!(timing.on_timer(&mut pin), Some(172));
        assert!(pin.high);
        assert_eq!(timing.on_timer(&mut pin), Some(172));
        assert!(!pin.high);
        assert_eq!(timing.on_timer(&mut pin), Some(172));
        assert!(pin.high);
        assert_eq!(timing.toggles(), 3);
    }

    #[test]
    fn test_rearm_replaces_schedule() {
        let timing = StepTiming::new();
        let mut generator = StepPulseGenerator::new(MockTimer::default(), &timing);
        generator.arm(500);
        generator.arm(100);

        assert_eq!(generator.timer.running, Some(100));
        assert_eq!(generator.timer.starts, 2);
        let mut pin = MockPin::default();
        assert_eq!(timing.on_timer(&mut pin), Some(100));
    }

    #[test]
    fn test_disarm_holds_level() {
        let timing = StepTiming::new();
        let mut generator = StepPulseGenerator::new(MockTimer::default(), &timing);
        let mut pin = MockPin::default();

        generator.arm(200);
        timing.on_timer(&mut pin);
        assert!(pin.high);

        generator.disarm();
        assert!(!generator.is_armed());
        assert_eq!(generator.timer.running, None);

        // A callback already in flight does nothing
        assert_eq!(timing.on_timer(&mut pin), None);
        assert!(pin.high);
        assert!(timing.level());
    }
}

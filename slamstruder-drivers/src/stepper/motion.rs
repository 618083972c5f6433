//! Feed motion controller
//!
//! Turns a commanded filament speed into a step interval and drives the
//! STEP/DIR driver's control lines. Step pulses themselves come from the
//! [`StepPulseGenerator`].

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
use slamstruder_core::config::{ConfigError, RetractConfig, StepperConfig};
use slamstruder_core::traits::{Direction, StepTimer, StepperError};

use super::pulse::StepPulseGenerator;

/// Shortest step interval (µs); a shorter one leaves a zero half-period
pub const MIN_US_PER_STEP: u32 = 2;

/// Motion controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepperState {
    /// Step interval (µs per full step)
    pub us_per_step: u32,
    /// Feed direction
    pub direction: Direction,
    /// Driver awake and pulses running
    pub enabled: bool,
}

/// Control lines of the STEP/DIR driver
pub struct DriverPins<DIR, SLEEP, MSTEP, RESET> {
    /// Direction select
    pub dir: DIR,
    /// Sleep line (high = awake)
    pub sleep: SLEEP,
    /// Microstep resolution select
    pub microstep: MSTEP,
    /// Reset line (low = held in reset)
    pub reset: RESET,
}

/// Retract in progress
///
/// Returned by [`MotionController::begin_retract`]; hand it back to
/// [`MotionController::end_retract`] once `duration_us` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetractMove {
    /// How long the retract runs (µs)
    pub duration_us: u64,
    /// State to restore afterwards
    pub resume: StepperState,
}

/// Convert a feed speed to a step interval
///
/// The interval is rounded to the nearest microsecond.
pub fn us_per_step(mm_per_step: f32, speed_mm_s: f32) -> Result<u32, StepperError> {
    if !speed_mm_s.is_finite() || speed_mm_s <= 0.0 {
        return Err(StepperError::InvalidSpeed);
    }

    let interval = libm::roundf(mm_per_step / speed_mm_s * 1_000_000.0);
    if !interval.is_finite() || interval >= u32::MAX as f32 {
        return Err(StepperError::SpeedTooLow);
    }

    let interval = interval as u32;
    if interval < MIN_US_PER_STEP {
        return Err(StepperError::SpeedTooHigh);
    }
    Ok(interval)
}

/// Feed motion controller
pub struct MotionController<'a, T, DIR, SLEEP, MSTEP, RESET> {
    config: StepperConfig,
    pins: DriverPins<DIR, SLEEP, MSTEP, RESET>,
    generator: StepPulseGenerator<'a, T>,
    state: StepperState,
}

impl<'a, T, DIR, SLEEP, MSTEP, RESET> MotionController<'a, T, DIR, SLEEP, MSTEP, RESET>
where
    T: StepTimer,
    DIR: OutputPin<Error = Infallible>,
    SLEEP: OutputPin<Error = Infallible>,
    MSTEP: OutputPin<Error = Infallible>,
    RESET: OutputPin<Error = Infallible>,
{
    /// Create a new motion controller
    ///
    /// The initial speed and direction come from the configuration. No line
    /// is driven until [`initialize_outputs`](Self::initialize_outputs).
    pub fn new(
        config: StepperConfig,
        pins: DriverPins<DIR, SLEEP, MSTEP, RESET>,
        generator: StepPulseGenerator<'a, T>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let us_per_step = us_per_step(config.mm_per_step, config.initial_speed_mm_s)
            .map_err(|_| ConfigError::InvalidInitialSpeed)?;

        Ok(Self {
            state: StepperState {
                us_per_step,
                direction: config.initial_direction,
                enabled: false,
            },
            config,
            pins,
            generator,
        })
    }

    /// Drive every control line to its startup level
    ///
    /// Driver asleep with pulses stopped, out of reset, microstepping and
    /// direction as configured.
    pub fn initialize_outputs(&mut self) {
        self.disable();
        write(&mut self.pins.dir, self.state.direction.is_high());
        write(&mut self.pins.microstep, self.config.fine_microstepping);
        write(&mut self.pins.reset, true);
    }

    /// Set the feed speed (mm/s)
    ///
    /// With `apply` set and the motor enabled, the pulse generator picks up
    /// the new interval immediately. Otherwise it takes effect on the next
    /// [`enable`](Self::enable). On error nothing changes.
    pub fn set_speed(&mut self, speed_mm_s: f32, apply: bool) -> Result<(), StepperError> {
        self.state.us_per_step = us_per_step(self.config.mm_per_step, speed_mm_s)?;

        if apply && self.state.enabled {
            self.generator.arm(self.half_period_us());
        }
        Ok(())
    }

    /// Set the speed at the nozzle (mm/s), scaled by the output ratio
    pub fn set_output_speed(&mut self, speed_mm_s: f32, apply: bool) -> Result<(), StepperError> {
        self.set_speed(speed_mm_s / self.config.output_ratio, apply)
    }

    /// Set the feed direction
    ///
    /// Takes effect on the next step; timing is unchanged.
    pub fn set_direction(&mut self, direction: Direction) {
        self.state.direction = direction;
        write(&mut self.pins.dir, direction.is_high());
    }

    /// Wake the driver and start stepping
    pub fn enable(&mut self) {
        write(&mut self.pins.sleep, true);
        self.generator.arm(self.half_period_us());
        self.state.enabled = true;
    }

    /// Stop stepping and put the driver to sleep
    pub fn disable(&mut self) {
        self.generator.disarm();
        write(&mut self.pins.sleep, false);
        self.state.enabled = false;
    }

    /// Start a retract move
    ///
    /// Reverses at the retract speed until [`end_retract`](Self::end_retract)
    /// is called with the returned move.
    pub fn begin_retract(&mut self, retract: &RetractConfig) -> Result<RetractMove, StepperError> {
        let resume = self.state;
        self.state.us_per_step = us_per_step(self.config.mm_per_step, retract.speed_mm_s)?;
        self.set_direction(Direction::Retract);
        self.enable();

        Ok(RetractMove {
            duration_us: retract.duration_us(),
            resume,
        })
    }

    /// Finish a retract move and restore the previous state
    ///
    /// The sleep line of a motor that was running stays high throughout.
    pub fn end_retract(&mut self, retract: RetractMove) {
        let resume = retract.resume;
        if !resume.enabled {
            self.disable();
        }
        self.state.us_per_step = resume.us_per_step;
        self.set_direction(resume.direction);
        if resume.enabled {
            self.enable();
        }
    }

    /// Step interval (µs)
    pub fn us_per_step(&self) -> u32 {
        self.state.us_per_step
    }

    /// Time between step line toggles (µs)
    pub fn half_period_us(&self) -> u32 {
        self.state.us_per_step / 2
    }

    /// Feed speed implied by the step interval (mm/s)
    pub fn speed_mm_s(&self) -> f32 {
        self.config.mm_per_step * 1_000_000.0 / self.state.us_per_step as f32
    }

    /// Feed direction
    pub fn direction(&self) -> Direction {
        self.state.direction
    }

    /// Check if the motor is running
    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Snapshot of the controller state
    pub fn state(&self) -> &StepperState {
        &self.state
    }

    /// Get the configuration
    pub fn config(&self) -> &StepperConfig {
        &self.config
    }
}

fn write<P: OutputPin<Error = Infallible>>(pin: &mut P, high: bool) {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.unwrap_or_else(|never| match never {});
}

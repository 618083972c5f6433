//! PID heater regulator
//!
//! Holds the hotend at a target temperature. The caller polls [`tick`]
//! as often as it likes; the control law runs at most once per configured
//! loop period and drives the heater with a PWM duty between zero and the
//! configured ceiling.
//!
//! Anti-windup: the integral term only absorbs a step's error when the
//! output of that step was not clamped.
//!
//! [`tick`]: HeaterRegulator::tick

use slamstruder_core::config::{ConfigError, HeaterConfig};
use slamstruder_core::safety::{GuardedReading, SensorGuard};
use slamstruder_core::telemetry::ControlRecord;
use slamstruder_core::timing::LoopGate;
use slamstruder_core::traits::{FanOutput, HeaterOutput, SensorError, TemperatureSensor};

/// Upper bound of the accumulated integral error
pub const MAX_INTEGRAL_ERROR: f32 = 10.0;

/// Regulator state
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeaterState {
    /// Latest temperature estimate (°C)
    pub current_c: f32,
    /// Target temperature (°C)
    pub target_c: f32,
    /// Regulation active
    pub enabled: bool,
    /// Accumulated error, within `[0, MAX_INTEGRAL_ERROR]`
    pub integral: f32,
    /// Error of the previous step, for the derivative term
    pub last_error: f32,
    /// Duty currently applied
    pub duty: u16,
}

impl HeaterState {
    const fn new() -> Self {
        Self {
            current_c: 0.0,
            target_c: 0.0,
            enabled: false,
            integral: 0.0,
            last_error: 0.0,
            duty: 0,
        }
    }
}

/// PID heater regulator with cooling fan
pub struct HeaterRegulator<S, H, F> {
    sensor: S,
    heater: H,
    fan: F,
    config: HeaterConfig,
    state: HeaterState,
    gate: LoopGate,
    guard: SensorGuard,
}

impl<S: TemperatureSensor, H: HeaterOutput, F: FanOutput> HeaterRegulator<S, H, F> {
    /// Create a new regulator
    ///
    /// Only validates the configuration; no output is touched until
    /// [`initialize_outputs`](Self::initialize_outputs).
    pub fn new(sensor: S, heater: H, fan: F, config: HeaterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sensor,
            heater,
            fan,
            gate: LoopGate::new(config.loop_period_us, 0),
            guard: SensorGuard::new(config.fault_policy),
            config,
            state: HeaterState::new(),
        })
    }

    /// Put the outputs in their safe state and take a first sample
    ///
    /// Heater off, fan off, regulator disabled. The loop schedule starts
    /// at `now_us`.
    pub fn initialize_outputs(&mut self, now_us: u64) -> Result<(), SensorError> {
        self.disable();
        self.gate.reset(now_us);
        self.refresh_temperature()
    }

    /// Start regulating
    ///
    /// Turns the hotend fan on. Integral and derivative memory carry over
    /// from before.
    pub fn enable(&mut self) {
        self.state.enabled = true;
        self.fan.set_on(true);
    }

    /// Stop regulating: heater off, fan off
    pub fn disable(&mut self) {
        self.state.enabled = false;
        self.state.duty = 0;
        self.heater.off();
        self.fan.set_on(false);
    }

    /// Set the target temperature (°C)
    ///
    /// Not range-checked here; see `Limits::check`.
    pub fn set_target(&mut self, target_c: f32) {
        self.state.target_c = target_c;
    }

    /// Get the target temperature (°C)
    pub fn target(&self) -> f32 {
        self.state.target_c
    }

    /// Latest temperature estimate (°C)
    pub fn current_temperature(&self) -> f32 {
        self.state.current_c
    }

    /// Check if regulation is active
    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Duty currently applied to the heater
    pub fn duty(&self) -> u16 {
        self.state.duty
    }

    /// Accumulated integral error
    pub fn integral_error(&self) -> f32 {
        self.state.integral
    }

    /// Error of the last executed step (°C)
    pub fn last_error(&self) -> f32 {
        self.state.last_error
    }

    /// Check if the hotend is within `tolerance_c` of the target
    pub fn is_at_target(&self, tolerance_c: f32) -> bool {
        (self.state.current_c - self.state.target_c).abs() <= tolerance_c
    }

    /// Fault seen on the most recent sample, if any
    pub fn last_fault(&self) -> Option<SensorError> {
        self.guard.last_fault()
    }

    /// Snapshot of the regulator state
    pub fn state(&self) -> &HeaterState {
        &self.state
    }

    /// Get the configuration
    pub fn config(&self) -> &HeaterConfig {
        &self.config
    }

    /// Poll the regulator
    ///
    /// Returns immediately with `Ok(None)` unless a loop period has elapsed.
    /// When one has, the temperature is re-sampled and, if enabled, one
    /// control step runs and its record is returned.
    ///
    /// Returns `Err` when the sample was unusable and the fault policy shut
    /// the heater down.
    pub fn tick(&mut self, now_us: u64) -> Result<Option<ControlRecord>, SensorError> {
        if !self.gate.poll(now_us) {
            return Ok(None);
        }

        self.refresh_temperature()?;

        if !self.state.enabled {
            return Ok(None);
        }

        Ok(Some(self.control_step(now_us)))
    }

    fn refresh_temperature(&mut self) -> Result<(), SensorError> {
        match self.guard.sample(&mut self.sensor) {
            GuardedReading::Fresh(temp_c) | GuardedReading::Substituted { temp_c, .. } => {
                self.state.current_c = temp_c;
                Ok(())
            }
            GuardedReading::Fault(fault) => {
                self.disable();
                Err(fault)
            }
        }
    }

    fn control_step(&mut self, now_us: u64) -> ControlRecord {
        let dt = self.config.loop_period_s();
        let gains = self.config.gains;

        let error = self.state.target_c - self.state.current_c;
        let trial_integral = (self.state.integral + error * dt).clamp(0.0, MAX_INTEGRAL_ERROR);
        let derivative = (error - self.state.last_error) / dt;

        // Integral term uses the committed value, not the trial
        let output = gains.kp * error + gains.ki * self.state.integral + gains.kd * derivative;
        let unclamped = output as i32;
        let duty = unclamped.clamp(0, i32::from(self.config.max_duty));

        // Non-finite terms never reach the stored state
        if duty == unclamped && trial_integral.is_finite() {
            self.state.integral = trial_integral;
        }
        if error.is_finite() {
            self.state.last_error = error;
        }

        let duty = duty as u16;
        self.state.duty = duty;
        self.heater.set_duty(duty);

        ControlRecord {
            timestamp_us: now_us,
            temperature_c: self.state.current_c,
            error_c: error,
            integral: self.state.integral,
            duty,
        }
    }
}

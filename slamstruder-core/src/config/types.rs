//! Configuration type definitions
//!
//! These types represent the extruder configuration. Configuration is
//! supplied at construction and never changes afterwards; `validate()` is
//! the only place constraints are checked.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::calibration::{PidGains, ThermistorCalibration};
use crate::safety::SensorFaultPolicy;
use crate::traits::Direction;

/// Full-scale heater duty (8-bit PWM)
pub const DUTY_FULL_SCALE: u16 = 255;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Thermistor coefficient is not finite
    InvalidThermistorModel,
    /// Pull-up resistance is zero
    InvalidPullup,
    /// ADC resolution outside the supported range
    InvalidAdcResolution,
    /// ADC averaging depth is zero
    InvalidAdcAveraging,
    /// A PID gain is negative or not finite
    InvalidGains,
    /// Maximum duty exceeds the PWM full scale
    InvalidMaxDuty,
    /// Control loop period is zero
    InvalidLoopPeriod,
    /// Distance per step is not a positive finite number
    InvalidStepDistance,
    /// Initial speed is not a positive finite number
    InvalidInitialSpeed,
    /// Output ratio is not a positive finite number
    InvalidOutputRatio,
    /// Retract speed or length is not a positive finite number
    InvalidRetract,
    /// Limit range is empty, not finite, or excludes its default
    InvalidLimits,
}

/// Heater regulator configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeaterConfig {
    /// PID gains
    pub gains: PidGains,
    /// Maximum heater duty in duty units
    ///
    /// A duty cycle that's too high can damage the thermistor and the
    /// nichrome winding, so this sits well below full scale.
    pub max_duty: u16,
    /// Duty value corresponding to 100% on
    pub duty_full_scale: u16,
    /// Control loop period (µs)
    pub loop_period_us: u32,
    /// What to do when the thermistor reading is unusable
    pub fault_policy: SensorFaultPolicy,
}

impl HeaterConfig {
    /// Stock hotend settings
    pub const HOTEND: Self = Self {
        gains: PidGains::HOTEND,
        max_duty: 220,
        duty_full_scale: DUTY_FULL_SCALE,
        loop_period_us: 10_000,
        fault_policy: SensorFaultPolicy::FaultAndDisable,
    };

    /// Loop period in seconds
    pub fn loop_period_s(&self) -> f32 {
        self.loop_period_us as f32 / 1_000_000.0
    }

    /// Validate the heater configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gains.validate()?;
        if self.duty_full_scale == 0 || self.max_duty > self.duty_full_scale {
            return Err(ConfigError::InvalidMaxDuty);
        }
        if self.loop_period_us == 0 {
            return Err(ConfigError::InvalidLoopPeriod);
        }
        Ok(())
    }
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self::HOTEND
    }
}

/// Filament feed stepper configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepperConfig {
    /// Filament travel per (micro)step (mm)
    pub mm_per_step: f32,
    /// Feed speed applied at startup (mm/s)
    pub initial_speed_mm_s: f32,
    /// Direction applied at startup
    pub initial_direction: Direction,
    /// Drive the microstep select line high (1/32 microstepping)
    pub fine_microstepping: bool,
    /// Millimetres extruded at the nozzle per millimetre fed in
    pub output_ratio: f32,
}

impl StepperConfig {
    /// Stock feed mechanism, calibrated from several measurements
    pub const FEEDER: Self = Self {
        mm_per_step: 0.00345,
        initial_speed_mm_s: 1.0,
        initial_direction: Direction::Extrude,
        fine_microstepping: true,
        output_ratio: 1.90,
    };

    /// Validate the stepper configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.mm_per_step) {
            return Err(ConfigError::InvalidStepDistance);
        }
        if !is_positive(self.initial_speed_mm_s) {
            return Err(ConfigError::InvalidInitialSpeed);
        }
        if !is_positive(self.output_ratio) {
            return Err(ConfigError::InvalidOutputRatio);
        }
        Ok(())
    }
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self::FEEDER
    }
}

/// Filament retract move
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetractConfig {
    /// Retract feed speed (mm/s)
    pub speed_mm_s: f32,
    /// Retract distance (mm)
    pub length_mm: f32,
}

impl RetractConfig {
    /// Stock retract: 3 mm at 10 mm/s
    pub const STOCK: Self = Self {
        speed_mm_s: 10.0,
        length_mm: 3.0,
    };

    /// Time the retract move takes (µs)
    pub fn duration_us(&self) -> u64 {
        (self.length_mm / self.speed_mm_s * 1_000_000.0) as u64
    }

    /// Validate the retract move
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.speed_mm_s) || !is_positive(self.length_mm) {
            return Err(ConfigError::InvalidRetract);
        }
        Ok(())
    }
}

impl Default for RetractConfig {
    fn default() -> Self {
        Self::STOCK
    }
}

/// Reason a commanded value was refused by [`Limits::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LimitError {
    /// Value is NaN or infinite
    NotFinite,
    /// Value is below the minimum
    BelowMinimum,
    /// Value is above the maximum
    AboveMaximum,
}

/// Allowed range for an operator-commanded value
///
/// Used for hotend targets (°C) and feed speeds (mm/s). The regulator and
/// motion controller do not check these themselves; whoever accepts the
/// command does.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Limits {
    /// Lowest accepted value
    pub min: f32,
    /// Highest accepted value
    pub max: f32,
    /// Value used at startup
    pub default: f32,
}

impl Limits {
    /// Hotend target temperature range (°C)
    pub const HOTEND_TARGET: Self = Self {
        min: 170.0,
        max: 300.0,
        default: 240.0,
    };

    /// Feed speed range (mm/s)
    pub const FEED_SPEED: Self = Self {
        min: 10.0,
        max: 200.0,
        default: 50.0,
    };

    /// Check a commanded value against the range
    pub fn check(&self, value: f32) -> Result<f32, LimitError> {
        if !value.is_finite() {
            Err(LimitError::NotFinite)
        } else if value < self.min {
            Err(LimitError::BelowMinimum)
        } else if value > self.max {
            Err(LimitError::AboveMaximum)
        } else {
            Ok(value)
        }
    }

    /// Validate the range itself
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.min.is_finite() && self.max.is_finite() && self.default.is_finite();
        if !finite || self.min > self.max || self.check(self.default).is_err() {
            return Err(ConfigError::InvalidLimits);
        }
        Ok(())
    }
}

/// Complete extruder configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtruderConfig {
    /// Thermistor calibration
    pub thermistor: ThermistorCalibration,
    /// Heater regulator settings
    pub heater: HeaterConfig,
    /// Feed stepper settings
    pub stepper: StepperConfig,
    /// Retract move
    pub retract: RetractConfig,
    /// Accepted hotend targets (°C)
    #[cfg_attr(feature = "serde", serde(deserialize_with = "limits_serde::hotend_target"))]
    pub target_limits: Limits,
    /// Accepted feed speeds (mm/s)
    #[cfg_attr(feature = "serde", serde(deserialize_with = "limits_serde::feed_speed"))]
    pub feed_limits: Limits,
}

impl ExtruderConfig {
    /// Stock SLAM board configuration
    pub const STOCK: Self = Self {
        thermistor: ThermistorCalibration::SEMITEC_104GT2,
        heater: HeaterConfig::HOTEND,
        stepper: StepperConfig::FEEDER,
        retract: RetractConfig::STOCK,
        target_limits: Limits::HOTEND_TARGET,
        feed_limits: Limits::FEED_SPEED,
    };

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thermistor.validate()?;
        self.heater.validate()?;
        self.stepper.validate()?;
        self.retract.validate()?;
        self.target_limits.validate()?;
        self.feed_limits.validate()?;
        Ok(())
    }
}

impl Default for ExtruderConfig {
    fn default() -> Self {
        Self::STOCK
    }
}

/// Partial `Limits` tables, filled in from the matching stock range
#[cfg(feature = "serde")]
mod limits_serde {
    use serde::{Deserialize, Deserializer};

    use super::Limits;

    #[derive(Deserialize)]
    struct PartialLimits {
        min: Option<f32>,
        max: Option<f32>,
        default: Option<f32>,
    }

    impl PartialLimits {
        fn over(self, stock: Limits) -> Limits {
            Limits {
                min: self.min.unwrap_or(stock.min),
                max: self.max.unwrap_or(stock.max),
                default: self.default.unwrap_or(stock.default),
            }
        }
    }

    pub fn hotend_target<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Limits, D::Error> {
        PartialLimits::deserialize(deserializer).map(|p| p.over(Limits::HOTEND_TARGET))
    }

    pub fn feed_speed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Limits, D::Error> {
        PartialLimits::deserialize(deserializer).map(|p| p.over(Limits::FEED_SPEED))
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stock_config_valid() {
        assert_eq!(ExtruderConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_max_duty_above_full_scale() {
        let mut config = ExtruderConfig::default();
        config.heater.max_duty = 300;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxDuty));
    }

    #[test]
    fn test_zero_loop_period() {
        let mut config = ExtruderConfig::default();
        config.heater.loop_period_us = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidLoopPeriod));
    }

    #[test]
    fn test_stepper_rejects_non_positive() {
        let mut config = ExtruderConfig::default();
        config.stepper.mm_per_step = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidStepDistance));

        let mut config = ExtruderConfig::default();
        config.stepper.initial_speed_mm_s = -5.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidInitialSpeed));

        let mut config = ExtruderConfig::default();
        config.retract.length_mm = f32::INFINITY;
        assert_eq!(config.validate(), Err(ConfigError::InvalidRetract));
    }

    #[test]
    fn test_loop_period_seconds() {
        let heater = HeaterConfig::default();
        assert!((heater.loop_period_s() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_retract_duration() {
        // 3 mm at 10 mm/s
        assert_eq!(RetractConfig::default().duration_us(), 300_000);
    }

    #[test]
    fn test_limits_check() {
        let limits = Limits::HOTEND_TARGET;
        assert_eq!(limits.check(240.0), Ok(240.0));
        assert_eq!(limits.check(170.0), Ok(170.0));
        assert_eq!(limits.check(301.0), Err(LimitError::AboveMaximum));
        assert_eq!(limits.check(20.0), Err(LimitError::BelowMinimum));
        assert_eq!(limits.check(f32::NAN), Err(LimitError::NotFinite));
    }

    #[test]
    fn test_limits_default_must_be_in_range() {
        let limits = Limits {
            min: 10.0,
            max: 200.0,
            default: 250.0,
        };
        assert_eq!(limits.validate(), Err(ConfigError::InvalidLimits));

        let inverted = Limits {
            min: 200.0,
            max: 10.0,
            default: 50.0,
        };
        assert_eq!(inverted.validate(), Err(ConfigError::InvalidLimits));
    }

    proptest! {
        #[test]
        fn prop_limits_check_matches_range(value in -1_000.0f32..1_000.0) {
            let limits = Limits::FEED_SPEED;
            let inside = (limits.min..=limits.max).contains(&value);
            prop_assert_eq!(limits.check(value).is_ok(), inside);
            if inside {
                prop_assert_eq!(limits.check(value), Ok(value));
            }
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn test_partial_limits_table_keeps_stock_values() {
        let config: ExtruderConfig = toml::from_str(
            "[target_limits]\n\
             max = 280.0\n\
             [feed_limits]\n\
             default = 20.0\n",
        )
        .unwrap();

        assert_eq!(
            config.target_limits,
            Limits {
                max: 280.0,
                ..Limits::HOTEND_TARGET
            }
        );
        assert_eq!(
            config.feed_limits,
            Limits {
                default: 20.0,
                ..Limits::FEED_SPEED
            }
        );
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_missing_limits_tables_use_stock() {
        let config: ExtruderConfig = toml::from_str("").unwrap();
        assert_eq!(config, ExtruderConfig::STOCK);
    }
}

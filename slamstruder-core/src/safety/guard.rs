//! Thermistor fault guard
//!
//! Screens every sample before it reaches the control law, so the PID loop
//! only ever sees a finite temperature.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::traits::{SensorError, TemperatureSensor};

/// What to do with an unusable thermistor sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorFaultPolicy {
    /// Pull rail samples into `[1, full_scale - 1]` and convert them;
    /// other faults hold the last good value
    ClampSample,
    /// Keep reporting the last good temperature
    HoldLastGood,
    /// Report the fault so the regulator shuts the heater down
    #[default]
    FaultAndDisable,
}

/// Outcome of a guarded sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GuardedReading {
    /// Valid temperature (°C)
    Fresh(f32),
    /// Sample was bad; temperature substituted according to the policy
    Substituted {
        /// Temperature to use (°C)
        temp_c: f32,
        /// What was wrong with the sample
        fault: SensorError,
    },
    /// Sample was bad and nothing can stand in for it
    Fault(SensorError),
}

impl GuardedReading {
    /// Temperature to feed the control law, if any
    pub fn temperature(&self) -> Option<f32> {
        match *self {
            GuardedReading::Fresh(t) => Some(t),
            GuardedReading::Substituted { temp_c, .. } => Some(temp_c),
            GuardedReading::Fault(_) => None,
        }
    }
}

/// Sensor fault guard
///
/// Tracks the last good reading and the most recent fault.
#[derive(Debug, Clone)]
pub struct SensorGuard {
    policy: SensorFaultPolicy,
    last_good_c: Option<f32>,
    last_fault: Option<SensorError>,
}

impl SensorGuard {
    /// Create a guard applying `policy`
    pub const fn new(policy: SensorFaultPolicy) -> Self {
        Self {
            policy,
            last_good_c: None,
            last_fault: None,
        }
    }

    /// Active policy
    pub fn policy(&self) -> SensorFaultPolicy {
        self.policy
    }

    /// Last temperature that came from a valid sample
    pub fn last_good(&self) -> Option<f32> {
        self.last_good_c
    }

    /// Fault seen on the most recent sample, if it was bad
    pub fn last_fault(&self) -> Option<SensorError> {
        self.last_fault
    }

    /// Take one sample through the guard
    pub fn sample<S: TemperatureSensor>(&mut self, sensor: &mut S) -> GuardedReading {
        let raw = match sensor.read_raw() {
            Ok(raw) => raw,
            Err(fault) => return self.on_fault(fault, None),
        };

        let raw = match sensor.check_sample(raw) {
            Ok(raw) => raw,
            Err(fault) => {
                let clamped = clamp_sample(raw, sensor.full_scale());
                let substitute = sensor.estimate(clamped);
                return self.on_fault(fault, Some(substitute));
            }
        };

        let temp = sensor.estimate(raw);
        if !temp.is_finite() {
            return self.on_fault(SensorError::OutOfRange, None);
        }

        self.last_good_c = Some(temp);
        self.last_fault = None;
        GuardedReading::Fresh(temp)
    }

    fn on_fault(&mut self, fault: SensorError, clamped_c: Option<f32>) -> GuardedReading {
        self.last_fault = Some(fault);

        let substitute = match self.policy {
            SensorFaultPolicy::FaultAndDisable => None,
            SensorFaultPolicy::ClampSample => clamped_c
                .filter(|t| t.is_finite())
                .or(self.last_good_c),
            SensorFaultPolicy::HoldLastGood => self.last_good_c,
        };

        // Nothing to hold on the very first sample
        match substitute {
            Some(temp_c) => GuardedReading::Substituted { temp_c, fault },
            None => GuardedReading::Fault(fault),
        }
    }
}

fn clamp_sample(raw: u16, full_scale: u32) -> u16 {
    let top = full_scale.saturating_sub(1).clamp(1, u32::from(u16::MAX)) as u16;
    raw.clamp(1, top)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sensor whose temperature is raw / 10, with scripted ADC failures
    struct ScriptedSensor {
        raw: Result<u16, SensorError>,
    }

    impl TemperatureSensor for ScriptedSensor {
        fn read_raw(&mut self) -> Result<u16, SensorError> {
            self.raw
        }

        fn full_scale(&self) -> u32 {
            4096
        }

        fn estimate(&self, raw: u16) -> f32 {
            raw as f32 / 10.0
        }
    }

    #[test]
    fn test_fresh_reading() {
        let mut guard = SensorGuard::new(SensorFaultPolicy::FaultAndDisable);
        let mut sensor = ScriptedSensor { raw: Ok(2000) };
        assert_eq!(guard.sample(&mut sensor), GuardedReading::Fresh(200.0));
        assert_eq!(guard.last_good(), Some(200.0));
        assert_eq!(guard.last_fault(), None);
    }

    #[test]
    fn test_fault_and_disable() {
        let mut guard = SensorGuard::new(SensorFaultPolicy::FaultAndDisable);
        let mut sensor = ScriptedSensor { raw: Ok(2000) };
        guard.sample(&mut sensor);

        sensor.raw = Ok(0);
        assert_eq!(
            guard.sample(&mut sensor),
            GuardedReading::Fault(SensorError::ShortCircuit)
        );
        assert_eq!(guard.last_fault(), Some(SensorError::ShortCircuit));
    }

    #[test]
    fn test_hold_last_good() {
        let mut guard = SensorGuard::new(SensorFaultPolicy::HoldLastGood);
        let mut sensor = ScriptedSensor { raw: Ok(2100) };
        guard.sample(&mut sensor);

        sensor.raw = Ok(4096);
        let reading = guard.sample(&mut sensor);
        assert_eq!(
            reading,
            GuardedReading::Substituted {
                temp_c: 210.0,
                fault: SensorError::OpenCircuit
            }
        );
        assert_eq!(reading.temperature(), Some(210.0));
    }

    #[test]
    fn test_hold_without_history_faults() {
        let mut guard = SensorGuard::new(SensorFaultPolicy::HoldLastGood);
        let mut sensor = ScriptedSensor {
            raw: Err(SensorError::ConversionError),
        };
        assert_eq!(
            guard.sample(&mut sensor),
            GuardedReading::Fault(SensorError::ConversionError)
        );
    }

    #[test]
    fn test_clamp_rail_samples() {
        let mut guard = SensorGuard::new(SensorFaultPolicy::ClampSample);

        let mut sensor = ScriptedSensor { raw: Ok(0) };
        assert_eq!(
            guard.sample(&mut sensor),
            GuardedReading::Substituted {
                temp_c: 0.1,
                fault: SensorError::ShortCircuit
            }
        );

        sensor.raw = Ok(4096);
        assert_eq!(
            guard.sample(&mut sensor),
            GuardedReading::Substituted {
                temp_c: 409.5,
                fault: SensorError::OpenCircuit
            }
        );

        // Clamped values are not remembered as good readings
        assert_eq!(guard.last_good(), None);
    }

    #[test]
    fn test_clamp_falls_back_to_hold_on_adc_error() {
        let mut guard = SensorGuard::new(SensorFaultPolicy::ClampSample);
        let mut sensor = ScriptedSensor { raw: Ok(1500) };
        guard.sample(&mut sensor);

        sensor.raw = Err(SensorError::ConversionError);
        assert_eq!(
            guard.sample(&mut sensor).temperature(),
            Some(150.0)
        );
    }

    #[test]
    fn test_recovery_clears_fault() {
        let mut guard = SensorGuard::new(SensorFaultPolicy::HoldLastGood);
        let mut sensor = ScriptedSensor { raw: Ok(1000) };
        guard.sample(&mut sensor);
        sensor.raw = Ok(0);
        guard.sample(&mut sensor);
        assert!(guard.last_fault().is_some());

        sensor.raw = Ok(1200);
        assert_eq!(guard.sample(&mut sensor), GuardedReading::Fresh(120.0));
        assert_eq!(guard.last_fault(), None);
    }
}

//! Heater and temperature sensor traits

/// Errors that can occur with temperature sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor disconnected (sample at full scale)
    OpenCircuit,
    /// Sensor shorted to ground (sample at zero)
    ShortCircuit,
    /// Model produced a non-finite temperature
    OutOfRange,
    /// ADC conversion error
    ConversionError,
}

/// ADC conversion failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcError;

/// ADC channel abstraction
pub trait AdcReader {
    /// Read one (possibly averaged) conversion
    fn read(&mut self) -> Result<u16, AdcError>;
}

/// Trait for temperature sensors
///
/// Sampling and conversion are separate steps so a caller can decide what
/// to do with a sample sitting on an ADC rail before converting it.
pub trait TemperatureSensor {
    /// Take a raw ADC sample
    ///
    /// Takes `&mut self` because ADC reads typically require mutable access.
    fn read_raw(&mut self) -> Result<u16, SensorError>;

    /// ADC full-scale count; usable samples lie in `1..full_scale`
    fn full_scale(&self) -> u32;

    /// Convert a raw sample to degrees Celsius
    ///
    /// Samples at either rail produce meaningless (possibly non-finite)
    /// results.
    fn estimate(&self, raw: u16) -> f32;

    /// Reject samples sitting on an ADC rail
    fn check_sample(&self, raw: u16) -> Result<u16, SensorError> {
        if raw == 0 {
            Err(SensorError::ShortCircuit)
        } else if u32::from(raw) >= self.full_scale() {
            Err(SensorError::OpenCircuit)
        } else {
            Ok(raw)
        }
    }

    /// Sample and convert, rejecting unusable readings
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_raw()?;
        let raw = self.check_sample(raw)?;
        let temp = self.estimate(raw);
        if temp.is_finite() {
            Ok(temp)
        } else {
            Err(SensorError::OutOfRange)
        }
    }
}

/// Trait for heater output control
///
/// Implementations drive the heater element through a PWM-capable
/// MOSFET. Duty is in duty units (0 = off).
pub trait HeaterOutput {
    /// Apply a duty cycle
    fn set_duty(&mut self, duty: u16);

    /// Currently applied duty cycle
    fn duty(&self) -> u16;

    /// Turn the heater fully off
    fn off(&mut self) {
        self.set_duty(0);
    }
}

/// Trait for the hotend cooling fan
pub trait FanOutput {
    /// Turn the fan on or off
    fn set_on(&mut self, on: bool);

    /// Check if the fan is currently on
    fn is_on(&self) -> bool;
}

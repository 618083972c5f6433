//! NTC thermistor sensor
//!
//! Glass-bead thermistor in the hotend, read through a pull-up voltage
//! divider. Temperature comes from the Steinhart-Hart model rather than a
//! lookup table since the hotend spans 20-300°C.

use slamstruder_core::config::ThermistorCalibration;
use slamstruder_core::traits::{AdcReader, SensorError, TemperatureSensor};

/// 0°C in kelvin
pub const KELVIN_OFFSET: f32 = 273.15;

/// Steinhart-Hart resistance-to-temperature model
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SteinhartHart {
    a: f32,
    b: f32,
    c: f32,
    pullup_ohms: f32,
    full_scale: u32,
}

impl SteinhartHart {
    /// Build the model from a calibration
    pub fn new(calibration: &ThermistorCalibration) -> Self {
        Self {
            a: calibration.coeff_a,
            b: calibration.coeff_b,
            c: calibration.coeff_c,
            pullup_ohms: calibration.pullup_ohms as f32,
            full_scale: calibration.adc_full_scale(),
        }
    }

    /// ADC full-scale count
    pub fn full_scale(&self) -> u32 {
        self.full_scale
    }

    /// Convert an ADC reading to thermistor resistance
    ///
    /// Circuit: VCC -- pullup -- ADC_PIN -- NTC -- GND
    /// R_ntc = R_pullup * adc / (full_scale - adc)
    pub fn resistance(&self, raw: u16) -> f32 {
        let raw = raw as f32;
        self.pullup_ohms * raw / (self.full_scale as f32 - raw)
    }

    /// Estimate temperature (°C) from a raw ADC count
    ///
    /// Only meaningful for `1 <= raw < full_scale`; a sample at either rail
    /// yields garbage and must be screened by the caller.
    pub fn estimate(&self, raw: u16) -> f32 {
        let log_r = libm::logf(self.resistance(raw));
        let inv_kelvin = self.a + self.b * log_r + self.c * log_r * log_r * log_r;
        1.0 / inv_kelvin - KELVIN_OFFSET
    }
}

/// Hotend thermistor on an ADC channel
pub struct Thermistor<ADC> {
    adc: ADC,
    model: SteinhartHart,
}

impl<ADC> Thermistor<ADC> {
    /// Create a thermistor sensor
    ///
    /// # Arguments
    /// - `adc`: ADC channel the divider midpoint is wired to
    /// - `calibration`: model coefficients and divider parameters
    pub fn new(adc: ADC, calibration: &ThermistorCalibration) -> Self {
        Self {
            adc,
            model: SteinhartHart::new(calibration),
        }
    }

    /// Get the conversion model
    pub fn model(&self) -> &SteinhartHart {
        &self.model
    }
}

impl<ADC: AdcReader> TemperatureSensor for Thermistor<ADC> {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.adc.read().map_err(|_| SensorError::ConversionError)
    }

    fn full_scale(&self) -> u32 {
        self.model.full_scale()
    }

    fn estimate(&self, raw: u16) -> f32 {
        self.model.estimate(raw)
    }
}

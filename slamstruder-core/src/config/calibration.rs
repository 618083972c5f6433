//! Calibration data types
//!
//! Empirical constants measured on the hotend: the thermistor model
//! coefficients and the PID gains tuned against the heater block.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::ConfigError;

/// Smallest supported ADC resolution in bits
pub const MIN_ADC_RESOLUTION_BITS: u8 = 8;

/// Largest supported ADC resolution in bits
pub const MAX_ADC_RESOLUTION_BITS: u8 = 16;

/// Thermistor measurement calibration
///
/// Coefficients of the Steinhart-Hart model
/// `1/T = A + B·ln(R) + C·ln(R)³` (T in kelvin, R in ohms), plus the
/// voltage divider and ADC parameters needed to get from a raw count to R.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ThermistorCalibration {
    /// Steinhart-Hart A coefficient
    pub coeff_a: f32,
    /// Steinhart-Hart B coefficient
    pub coeff_b: f32,
    /// Steinhart-Hart C coefficient
    pub coeff_c: f32,
    /// Pull-up resistor on the thermistor connector (ohms)
    pub pullup_ohms: u32,
    /// ADC resolution in bits
    pub adc_resolution_bits: u8,
    /// Number of conversions averaged into one sample
    pub adc_averaging: u8,
}

impl ThermistorCalibration {
    /// Semitec 104GT-2 glass thermistor behind a 4.7K pull-up, 12-bit ADC
    pub const SEMITEC_104GT2: Self = Self {
        coeff_a: 0.000_811_290_16,
        coeff_b: 0.000_211_355_79,
        coeff_c: 7.176_147_3e-8,
        pullup_ohms: 4700,
        adc_resolution_bits: 12,
        adc_averaging: 8,
    };

    /// ADC full-scale count (2^resolution)
    ///
    /// Valid samples lie in `1..full_scale`.
    pub const fn adc_full_scale(&self) -> u32 {
        1u32 << self.adc_resolution_bits
    }

    /// Validate the calibration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let coeffs = [self.coeff_a, self.coeff_b, self.coeff_c];
        if coeffs.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::InvalidThermistorModel);
        }
        if self.pullup_ohms == 0 {
            return Err(ConfigError::InvalidPullup);
        }
        if !(MIN_ADC_RESOLUTION_BITS..=MAX_ADC_RESOLUTION_BITS).contains(&self.adc_resolution_bits)
        {
            return Err(ConfigError::InvalidAdcResolution);
        }
        if self.adc_averaging == 0 {
            return Err(ConfigError::InvalidAdcAveraging);
        }
        Ok(())
    }
}

impl Default for ThermistorCalibration {
    fn default() -> Self {
        Self::SEMITEC_104GT2
    }
}

/// PID gains
///
/// Applied to an error in °C, an integral in °C·s and a derivative in
/// °C/s, producing heater duty units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PidGains {
    /// Proportional gain (Kp)
    pub kp: f32,
    /// Integral gain (Ki)
    pub ki: f32,
    /// Derivative gain (Kd)
    pub kd: f32,
}

impl PidGains {
    /// Ziegler-Nichols gains for the stock nichrome hotend
    pub const HOTEND: Self = Self {
        kp: 30.0,
        ki: 26.9,
        kd: 8.3625,
    };

    /// Create gains
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// Validate the gains
    ///
    /// Gains must be finite and non-negative; a zero gain disables its term.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gains = [self.kp, self.ki, self.kd];
        if gains.iter().any(|g| !g.is_finite() || *g < 0.0) {
            return Err(ConfigError::InvalidGains);
        }
        Ok(())
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::HOTEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_from_resolution() {
        let cal = ThermistorCalibration::default();
        assert_eq!(cal.adc_full_scale(), 4096);

        let ten_bit = ThermistorCalibration {
            adc_resolution_bits: 10,
            ..Default::default()
        };
        assert_eq!(ten_bit.adc_full_scale(), 1024);
    }

    #[test]
    fn test_default_calibration_valid() {
        assert_eq!(ThermistorCalibration::default().validate(), Ok(()));
        assert_eq!(PidGains::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_calibration() {
        let cal = ThermistorCalibration {
            coeff_b: f32::NAN,
            ..Default::default()
        };
        assert_eq!(cal.validate(), Err(ConfigError::InvalidThermistorModel));

        let cal = ThermistorCalibration {
            adc_resolution_bits: 20,
            ..Default::default()
        };
        assert_eq!(cal.validate(), Err(ConfigError::InvalidAdcResolution));

        let cal = ThermistorCalibration {
            pullup_ohms: 0,
            ..Default::default()
        };
        assert_eq!(cal.validate(), Err(ConfigError::InvalidPullup));
    }

    #[test]
    fn test_rejects_negative_gain() {
        let gains = PidGains::new(30.0, -1.0, 0.0);
        assert_eq!(gains.validate(), Err(ConfigError::InvalidGains));
    }
}

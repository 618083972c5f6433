//! Thermistor ADC reader
//!
//! RP2040 has a single 12-bit ADC with 4 external channels on
//! GPIO26..=GPIO29. There's no hardware averaging, so the reader sums
//! several blocking conversions per sample.

use embassy_rp::adc::{Adc, Blocking, Channel};
use slamstruder_core::config::ThermistorCalibration;
use slamstruder_core::traits::{AdcError, AdcReader};

/// Native resolution of the RP2040 ADC
pub const RP2040_ADC_BITS: u8 = 12;

/// Averaging ADC reader for one channel
pub struct AveragingAdc<'d> {
    adc: Adc<'d, Blocking>,
    channel: Channel<'d>,
    samples: u8,
}

impl<'d> AveragingAdc<'d> {
    /// Create a reader averaging `calibration.adc_averaging` conversions
    pub fn new(adc: Adc<'d, Blocking>, channel: Channel<'d>, calibration: &ThermistorCalibration) -> Self {
        Self {
            adc,
            channel,
            samples: calibration.adc_averaging.max(1),
        }
    }

    /// Conversions per sample
    pub fn samples(&self) -> u8 {
        self.samples
    }
}

impl AdcReader for AveragingAdc<'_> {
    fn read(&mut self) -> Result<u16, AdcError> {
        let mut sum: u32 = 0;
        for _ in 0..self.samples {
            let value = self.adc.blocking_read(&mut self.channel).map_err(|_| AdcError)?;
            sum += u32::from(value);
        }
        Ok((sum / u32::from(self.samples)) as u16)
    }
}

//! Diagnostic records
//!
//! Each executed heater control step yields one [`ControlRecord`]. The
//! regulator only produces records; where they go is up to the caller.

use core::fmt;

/// One executed control step
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlRecord {
    /// Monotonic timestamp of the step (µs)
    pub timestamp_us: u64,
    /// Estimated hotend temperature (°C)
    pub temperature_c: f32,
    /// Target minus current temperature (°C)
    pub error_c: f32,
    /// Integral error after the anti-windup decision
    pub integral: f32,
    /// Duty applied to the heater
    pub duty: u16,
}

/// Whitespace-separated line: `timestamp temperature error integral duty`
impl fmt::Display for ControlRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.2} {:.2} {:.2} {}",
            self.timestamp_us, self.temperature_c, self.error_c, self.integral, self.duty
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    #[test]
    fn test_display_line() {
        let record = ControlRecord {
            timestamp_us: 1_250_000,
            temperature_c: 200.0,
            error_c: 40.0,
            integral: 0.4,
            duty: 220,
        };
        assert_eq!(record.to_string(), "1250000 200.00 40.00 0.40 220");
    }

    #[test]
    fn test_display_negative_error() {
        let record = ControlRecord {
            timestamp_us: 7,
            temperature_c: 245.5,
            error_c: -5.5,
            integral: 0.0,
            duty: 0,
        };
        assert_eq!(record.to_string(), "7 245.50 -5.50 0.00 0");
    }
}

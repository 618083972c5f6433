//! Stepper motor traits
//!
//! The feed stepper is driven by a STEP/DIR driver: a periodic timer toggles
//! the step line while direction and sleep are plain GPIO.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Filament feed direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Push filament toward the nozzle (direction line high)
    #[default]
    Extrude,
    /// Pull filament back (direction line low)
    Retract,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Extrude => Direction::Retract,
            Direction::Retract => Direction::Extrude,
        }
    }

    /// Direction line level for this direction
    pub fn is_high(self) -> bool {
        matches!(self, Direction::Extrude)
    }

    /// Direction corresponding to a line level
    pub fn from_level(high: bool) -> Self {
        if high {
            Direction::Extrude
        } else {
            Direction::Retract
        }
    }
}

/// Errors that can occur with stepper operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// Speed is zero, negative or not finite
    InvalidSpeed,
    /// Speed needs a half-period shorter than the timer resolution
    SpeedTooHigh,
    /// Step interval does not fit the timer's 32-bit microsecond range
    SpeedTooLow,
}

/// Periodic hardware timer that drives the step line
///
/// The timer fires a callback every half-period until cancelled. The
/// callback itself lives with the implementation (interrupt handler or
/// high-priority task).
pub trait StepTimer {
    /// (Re)start the periodic callback
    ///
    /// Any running schedule is replaced.
    fn start(&mut self, half_period_us: u32);

    /// Stop the periodic callback
    fn cancel(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_levels() {
        assert!(Direction::Extrude.is_high());
        assert!(!Direction::Retract.is_high());
        assert_eq!(Direction::from_level(true), Direction::Extrude);
        assert_eq!(Direction::from_level(false), Direction::Retract);
    }

    #[test]
    fn test_opposite() {
        assert_eq!(Direction::Extrude.opposite(), Direction::Retract);
        assert_eq!(Direction::Retract.opposite(), Direction::Extrude);
    }
}

//! Hardware abstraction traits
//!
//! These traits define the interface between the control logic
//! and hardware-specific implementations.

pub mod heater;
pub mod stepper;

pub use heater::{AdcError, AdcReader, FanOutput, HeaterOutput, SensorError, TemperatureSensor};
pub use stepper::{Direction, StepTimer, StepperError};

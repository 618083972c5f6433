//! Heater control

pub mod output;
pub mod regulator;

pub use output::{GpioFan, PwmHeater};
pub use regulator::{HeaterRegulator, HeaterState, MAX_INTEGRAL_ERROR};

//! Hardware driver implementations
//!
//! Concrete implementations of the traits defined in slamstruder-core
//! for the extruder hardware:
//!
//! - Hotend thermistor (Steinhart-Hart)
//! - PID heater regulator, PWM heater and fan outputs
//! - Step pulse generator and feed motion controller

#![no_std]
#![deny(unsafe_code)]

pub mod heater;
pub mod sensor;
pub mod stepper;

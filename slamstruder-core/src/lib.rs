//! Board-agnostic core logic for the extruder firmware
//!
//! This crate contains everything that does not depend on specific
//! hardware implementations:
//!
//! - Hardware abstraction traits (thermistor, heater, fan, step timer)
//! - Configuration types and validation
//! - Control loop timing
//! - Thermistor fault policy
//! - Diagnostic records

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod safety;
pub mod telemetry;
pub mod timing;
pub mod traits;

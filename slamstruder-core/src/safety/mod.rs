//! Safety handling
//!
//! Decides what the heater loop sees when the thermistor reading is bad.

pub mod guard;

pub use guard::{GuardedReading, SensorFaultPolicy, SensorGuard};

//! Temperature sensors

pub mod thermistor;

pub use thermistor::{SteinhartHart, Thermistor, KELVIN_OFFSET};

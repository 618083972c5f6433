//! RP2040-specific HAL for the extruder firmware
//!
//! Adapters between the RP2040 peripherals (via embassy-rp) and the
//! slamstruder-core traits:
//!
//! - Averaging thermistor ADC reader
//! - Heater PWM slice
//! - Step timer and step pulse runner on embassy-time

#![no_std]

pub mod adc;
pub mod pwm;
pub mod timer;

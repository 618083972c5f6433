//! Build-time configuration
//!
//! `CONFIG` is generated by build.rs from extruder.toml, which has already
//! been validated by the time this compiles.

use slamstruder_core::config::{
    ExtruderConfig, HeaterConfig, Limits, PidGains, RetractConfig, StepperConfig,
    ThermistorCalibration,
};
use slamstruder_core::safety::SensorFaultPolicy;
use slamstruder_core::traits::Direction;

include!(concat!(env!("OUT_DIR"), "/config.rs"));

//! Configuration types
//!
//! Board-agnostic configuration structures, validated once at startup.

pub mod calibration;
pub mod types;

pub use calibration::*;
pub use types::*;

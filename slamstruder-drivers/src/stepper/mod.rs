//! Feed stepper control

pub mod motion;
pub mod pulse;

pub use motion::{us_per_step, DriverPins, MotionController, RetractMove, StepperState};
pub use pulse::{next_deadline_us, StepPulseGenerator, StepTiming};

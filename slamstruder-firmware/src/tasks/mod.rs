//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod control;
pub mod step;
pub mod telemetry;

pub use control::{control_task, Motion, Regulator};
pub use step::step_task;
pub use telemetry::telemetry_task;

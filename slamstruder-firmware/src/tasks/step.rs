//! Step pulse task
//!
//! Runs on the high-priority interrupt executor so the step line keeps its
//! cadence while the control task is busy.

use defmt::info;
use embassy_rp::gpio::Output;

use slamstruder_hal_rp2040::timer::run_step_pulses;

use crate::channels::{STEP_TIMER, STEP_TIMING};

/// Step pulse task
#[embassy_executor::task]
pub async fn step_task(step_pin: Output<'static>) {
    info!("Step pulse task started");
    run_step_pulses(&STEP_TIMER, &STEP_TIMING, step_pin).await
}

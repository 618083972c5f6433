//! Control task
//!
//! The single polling context. Owns the heater regulator and the motion
//! controller, applies operator commands between regulator ticks and times
//! retract moves. Nothing in here blocks: every pass drains the command
//! queue, polls the regulator and sleeps for one poll interval.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Instant, Timer};

use slamstruder_core::config::ExtruderConfig;
use slamstruder_core::traits::SensorError;
use slamstruder_drivers::heater::{GpioFan, HeaterRegulator, PwmHeater};
use slamstruder_drivers::sensor::Thermistor;
use slamstruder_drivers::stepper::{MotionController, RetractMove};
use slamstruder_hal_rp2040::adc::AveragingAdc;
use slamstruder_hal_rp2040::pwm::HeaterPwm;
use slamstruder_hal_rp2040::timer::SignalStepTimer;

use crate::channels::{ExtruderCommand, EXTRUDER_CMD, TELEMETRY};

/// Time between polls of the regulator (µs)
///
/// Well under the loop period, so a due step runs at most this late.
const POLL_INTERVAL_US: u64 = 250;

/// Hotend regulator as wired on the board
pub type Regulator = HeaterRegulator<
    Thermistor<AveragingAdc<'static>>,
    PwmHeater<HeaterPwm<'static>>,
    GpioFan<Output<'static>>,
>;

/// Feed motion controller as wired on the board
pub type Motion = MotionController<
    'static,
    SignalStepTimer,
    Output<'static>,
    Output<'static>,
    Output<'static>,
    Output<'static>,
>;

/// Retract being timed by the control task
struct ActiveRetract {
    plan: RetractMove,
    ends_at_us: u64,
}

/// Control task state
struct Controller {
    heater: Regulator,
    motion: Motion,
    config: ExtruderConfig,
    retract: Option<ActiveRetract>,
    fault: Option<SensorError>,
}

impl Controller {
    fn handle_command(&mut self, cmd: ExtruderCommand, now_us: u64) {
        debug!("Command: {:?}", cmd);

        match cmd {
            ExtruderCommand::SetTarget(target_c) => {
                match self.config.target_limits.check(target_c) {
                    Ok(target_c) => self.heater.set_target(target_c),
                    Err(e) => warn!("Target {}°C rejected: {:?}", target_c, e),
                }
            }
            ExtruderCommand::EnableHeater => {
                info!("Heater on, target {}°C", self.heater.target());
                self.heater.enable();
            }
            ExtruderCommand::DisableHeater => {
                info!("Heater off");
                self.heater.disable();
            }
            ExtruderCommand::SetSpeed(speed) => {
                self.finish_retract();
                if let Err(e) = self.config.feed_limits.check(speed) {
                    warn!("Feed speed {} mm/s rejected: {:?}", speed, e);
                } else if let Err(e) = self.motion.set_speed(speed, true) {
                    warn!("Feed speed {} mm/s not reachable: {:?}", speed, e);
                }
            }
            ExtruderCommand::SetOutputSpeed(speed) => {
                self.finish_retract();
                if let Err(e) = self.config.feed_limits.check(speed) {
                    warn!("Output speed {} mm/s rejected: {:?}", speed, e);
                } else if let Err(e) = self.motion.set_output_speed(speed, true) {
                    warn!("Output speed {} mm/s not reachable: {:?}", speed, e);
                }
            }
            ExtruderCommand::SetDirection(direction) => {
                self.finish_retract();
                self.motion.set_direction(direction);
            }
            ExtruderCommand::EnableMotor => {
                self.finish_retract();
                self.motion.enable();
                info!("Feeding at {} µs/step", self.motion.us_per_step());
            }
            ExtruderCommand::DisableMotor => {
                self.finish_retract();
                self.motion.disable();
                info!("Feed stopped");
            }
            ExtruderCommand::Retract => self.start_retract(now_us),
        }
    }

    fn start_retract(&mut self, now_us: u64) {
        if self.retract.is_some() {
            debug!("Retract already running");
            return;
        }

        match self.motion.begin_retract(&self.config.retract) {
            Ok(plan) => {
                debug!("Retracting for {} µs", plan.duration_us);
                self.retract = Some(ActiveRetract {
                    ends_at_us: now_us + plan.duration_us,
                    plan,
                });
            }
            Err(e) => warn!("Retract not possible: {:?}", e),
        }
    }

    /// Restore the pre-retract state, if a retract is running
    fn finish_retract(&mut self) {
        if let Some(active) = self.retract.take() {
            self.motion.end_retract(active.plan);
            debug!("Retract complete");
        }
    }

    fn poll_retract(&mut self, now_us: u64) {
        let due = matches!(&self.retract, Some(active) if now_us >= active.ends_at_us);
        if due {
            self.finish_retract();
        }
    }

    fn poll_heater(&mut self, now_us: u64) {
        match self.heater.tick(now_us) {
            Ok(Some(record)) => {
                if TELEMETRY.try_send(record).is_err() {
                    trace!("Telemetry queue full, record dropped");
                }
            }
            Ok(None) => {}
            Err(fault) => {
                if self.fault != Some(fault) {
                    error!("Thermistor fault ({:?}), heater disabled", fault);
                    self.fault = Some(fault);
                }
                return;
            }
        }

        // Substituted samples still report a fault
        let fault = self.heater.last_fault();
        if fault != self.fault {
            match fault {
                Some(fault) => warn!("Thermistor reading bad: {:?}", fault),
                None => info!("Thermistor reading recovered"),
            }
            self.fault = fault;
        }
    }
}

/// Control task
///
/// Puts every output in its safe state, then polls forever.
#[embassy_executor::task]
pub async fn control_task(heater: Regulator, motion: Motion, config: ExtruderConfig) {
    info!("Control task started");

    let mut controller = Controller {
        heater,
        motion,
        config,
        retract: None,
        fault: None,
    };

    if let Err(fault) = controller
        .heater
        .initialize_outputs(Instant::now().as_micros())
    {
        warn!("First thermistor sample failed: {:?}", fault);
        controller.fault = Some(fault);
    }
    controller.motion.initialize_outputs();
    info!(
        "Hotend at {}°C, feed interval {} µs/step",
        controller.heater.current_temperature(),
        controller.motion.us_per_step()
    );

    loop {
        let now_us = Instant::now().as_micros();

        while let Ok(cmd) = EXTRUDER_CMD.try_receive() {
            controller.handle_command(cmd, now_us);
        }

        controller.poll_retract(now_us);
        controller.poll_heater(now_us);

        Timer::after_micros(POLL_INTERVAL_US).await;
    }
}

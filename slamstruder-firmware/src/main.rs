//! Slamstruder - Extruder Attachment Firmware
//!
//! Main firmware binary for the RP2040-based extruder board. Regulates the
//! hotend with a PID loop and feeds filament at a constant linear rate.
//!
//! Two executors share the chip: the thread executor runs the control and
//! telemetry tasks, and an interrupt executor on SWI_IRQ_1 runs the step
//! pulse task so it preempts the control loop.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::adc::{Adc, Channel as AdcChannel, Config as AdcConfig};
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::pwm::Pwm;
use {defmt_rtt as _, panic_probe as _};

use slamstruder_drivers::heater::{GpioFan, HeaterRegulator, PwmHeater};
use slamstruder_drivers::sensor::Thermistor;
use slamstruder_drivers::stepper::{DriverPins, MotionController, StepPulseGenerator};
use slamstruder_hal_rp2040::adc::AveragingAdc;
use slamstruder_hal_rp2040::pwm::{heater_pwm_config, HeaterPwm, HEATER_PWM_HZ};
use slamstruder_hal_rp2040::timer::SignalStepTimer;

use crate::channels::{ExtruderCommand, EXTRUDER_CMD, STEP_TIMER, STEP_TIMING};
use crate::config::CONFIG;

mod channels;
mod config;
mod tasks;

/// Executor for the step pulse task
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Slamstruder firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Board wiring:
    //   thermistor  GPIO26 (ADC0)    heater  GPIO22 (PWM3 A)    fan    GPIO9
    //   step        GPIO16           dir     GPIO17             mstep  GPIO13
    //   reset       GPIO14           sleep   GPIO15

    // Hotend
    let adc = Adc::new_blocking(p.ADC, AdcConfig::default());
    let therm_channel = AdcChannel::new_pin(p.PIN_26, Pull::None);
    let sensor = Thermistor::new(
        AveragingAdc::new(adc, therm_channel, &CONFIG.thermistor),
        &CONFIG.thermistor,
    );

    let pwm_config = heater_pwm_config(CONFIG.heater.duty_full_scale, HEATER_PWM_HZ);
    let pwm = Pwm::new_output_a(p.PWM_SLICE3, p.PIN_22, pwm_config.clone());
    let heater = PwmHeater::new(HeaterPwm::new(pwm, pwm_config), CONFIG.heater.duty_full_scale);
    let fan = GpioFan::new_active_high(Output::new(p.PIN_9, Level::Low));

    let regulator = match HeaterRegulator::new(sensor, heater, fan, CONFIG.heater) {
        Ok(regulator) => regulator,
        Err(e) => {
            error!("Heater configuration rejected: {:?}", e);
            return;
        }
    };
    info!("Heater initialized");

    // Feed stepper
    let pins = DriverPins {
        dir: Output::new(p.PIN_17, Level::Low),
        sleep: Output::new(p.PIN_15, Level::Low),
        microstep: Output::new(p.PIN_13, Level::Low),
        reset: Output::new(p.PIN_14, Level::Low),
    };
    let generator = StepPulseGenerator::new(SignalStepTimer::new(&STEP_TIMER), &STEP_TIMING);
    let motion = match MotionController::new(CONFIG.stepper, pins, generator) {
        Ok(motion) => motion,
        Err(e) => {
            error!("Stepper configuration rejected: {:?}", e);
            return;
        }
    };
    let step_pin = Output::new(p.PIN_16, Level::Low);
    info!("Stepper initialized");

    // Step pulses preempt everything on the thread executor
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high_spawner.spawn(tasks::step_task(step_pin)).unwrap();

    spawner.spawn(tasks::telemetry_task()).unwrap();
    spawner
        .spawn(tasks::control_task(regulator, motion, CONFIG))
        .unwrap();

    // Start holding the default target; feeding waits for a command
    EXTRUDER_CMD
        .send(ExtruderCommand::SetTarget(CONFIG.target_limits.default))
        .await;
    EXTRUDER_CMD.send(ExtruderCommand::EnableHeater).await;

    info!("All tasks spawned, firmware running");
}

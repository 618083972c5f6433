//! Inter-task communication channels
//!
//! Defines the statics shared between Embassy tasks. Uses embassy-sync
//! primitives for async communication and a lock-free timing block for the
//! step pulse path.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use slamstruder_core::telemetry::ControlRecord;
use slamstruder_core::traits::Direction;
use slamstruder_drivers::stepper::StepTiming;
use slamstruder_hal_rp2040::timer::StepTimerSignal;

/// Channel capacity for operator commands
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Channel capacity for control records
///
/// At a 10ms loop this is 160ms of slack for the log sink.
const TELEMETRY_CHANNEL_SIZE: usize = 16;

/// Operator command for the control task
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum ExtruderCommand {
    /// Set the hotend target (°C)
    SetTarget(f32),
    /// Start regulating the hotend
    EnableHeater,
    /// Heater and fan off
    DisableHeater,
    /// Set the filament feed speed (mm/s)
    SetSpeed(f32),
    /// Set the speed at the nozzle (mm/s)
    SetOutputSpeed(f32),
    /// Set the feed direction
    SetDirection(Direction),
    /// Start feeding
    EnableMotor,
    /// Stop feeding
    DisableMotor,
    /// Pull the filament back by the configured retract length
    Retract,
}

/// Commands into the control task
pub static EXTRUDER_CMD: Channel<CriticalSectionRawMutex, ExtruderCommand, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Heater control records out of the control task
pub static TELEMETRY: Channel<CriticalSectionRawMutex, ControlRecord, TELEMETRY_CHANNEL_SIZE> =
    Channel::new();

/// Step timer commands (control task to step task)
pub static STEP_TIMER: StepTimerSignal = Signal::new();

/// Step interval and arm state, read by the step task every half-period
pub static STEP_TIMING: StepTiming = StepTiming::new();

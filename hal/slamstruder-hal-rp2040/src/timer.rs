//! Step timer on embassy-time
//!
//! The control side implements [`StepTimer`] by posting commands to a
//! [`Signal`]. The pulse side, [`run_step_pulses`], runs in a task on a
//! high-priority interrupt executor so it preempts the control loop, and
//! toggles the step pin every half-period.

use core::convert::Infallible;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::OutputPin;
use slamstruder_core::traits::StepTimer;
use slamstruder_drivers::stepper::{next_deadline_us, StepTiming};

/// Command for the pulse runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepTimerCommand {
    /// (Re)start with this half-period (µs)
    Start(u32),
    /// Stop toggling
    Stop,
}

/// Signal carrying the latest timer command
pub type StepTimerSignal = Signal<CriticalSectionRawMutex, StepTimerCommand>;

/// [`StepTimer`] backed by a command signal
///
/// Commands overwrite each other; the runner only acts on the latest.
pub struct SignalStepTimer {
    commands: &'static StepTimerSignal,
}

impl SignalStepTimer {
    /// Create a timer posting to `commands`
    pub const fn new(commands: &'static StepTimerSignal) -> Self {
        Self { commands }
    }
}

impl StepTimer for SignalStepTimer {
    fn start(&mut self, half_period_us: u32) {
        self.commands.signal(StepTimerCommand::Start(half_period_us));
    }

    fn cancel(&mut self) {
        self.commands.signal(StepTimerCommand::Stop);
    }
}

/// Toggle `step_pin` according to `timing` until the end of time
///
/// Deadlines after each toggle come from [`next_deadline_us`].
pub async fn run_step_pulses<P>(commands: &StepTimerSignal, timing: &StepTiming, mut step_pin: P) -> !
where
    P: OutputPin<Error = Infallible>,
{
    let mut running = false;
    let mut deadline = Instant::now();

    loop {
        if !running {
            if let StepTimerCommand::Start(half_period_us) = commands.wait().await {
                deadline = Instant::now() + half_period(half_period_us);
                running = true;
            }
            continue;
        }

        match select(Timer::at(deadline), commands.wait()).await {
            Either::First(()) => match timing.on_timer(&mut step_pin) {
                Some(half_period_us) => {
                    let next = next_deadline_us(
                        deadline.as_micros(),
                        Instant::now().as_micros(),
                        half_period_us,
                    );
                    deadline = Instant::from_micros(next);
                }
                None => running = false,
            },
            Either::Second(StepTimerCommand::Start(half_period_us)) => {
                deadline = Instant::now() + half_period(half_period_us);
            }
            Either::Second(StepTimerCommand::Stop) => running = false,
        }
    }
}

fn half_period(half_period_us: u32) -> Duration {
    Duration::from_micros(u64::from(half_period_us.max(1)))
}

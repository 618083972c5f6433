//! Heater PWM slice
//!
//! The heater MOSFET sits on channel A of a PWM slice. The slice counts
//! `0..=top` with `top` equal to the duty full scale, so one duty unit is
//! one counter step.

use core::convert::Infallible;

use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::pwm::{Config, Pwm};
use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use fixed::types::U12F4;

/// Default heater PWM frequency (Hz)
pub const HEATER_PWM_HZ: u32 = 1_000;

/// Build a slice configuration for the heater
///
/// # Arguments
/// - `full_scale`: duty value meaning 100% on (becomes `top`)
/// - `frequency_hz`: target PWM frequency, limited by the divider range
pub fn heater_pwm_config(full_scale: u16, frequency_hz: u32) -> Config {
    let counts = (u32::from(full_scale) + 1) * frequency_hz.max(1);
    let divider = (clk_sys_freq() / counts).clamp(1, 255);

    let mut config = Config::default();
    config.top = full_scale;
    config.divider = U12F4::from_num(divider);
    config.compare_a = 0;
    config
}

/// Heater output on PWM channel A
pub struct HeaterPwm<'d> {
    pwm: Pwm<'d>,
    config: Config,
}

impl<'d> HeaterPwm<'d> {
    /// Take over a slice configured with [`heater_pwm_config`]
    ///
    /// The output starts off.
    pub fn new(mut pwm: Pwm<'d>, mut config: Config) -> Self {
        config.compare_a = 0;
        pwm.set_config(&config);
        Self { pwm, config }
    }
}

impl ErrorType for HeaterPwm<'_> {
    type Error = Infallible;
}

impl SetDutyCycle for HeaterPwm<'_> {
    fn max_duty_cycle(&self) -> u16 {
        self.config.top
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.config.compare_a = duty.min(self.config.top);
        self.pwm.set_config(&self.config);
        Ok(())
    }
}

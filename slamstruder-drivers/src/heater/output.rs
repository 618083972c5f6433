//! Heater and fan outputs
//!
//! The heater MOSFET is driven from a PWM channel; the hotend fan is a
//! plain GPIO (directly or via a transistor).

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use slamstruder_core::traits::{FanOutput, HeaterOutput};

/// PWM heater output
///
/// Duty is given in duty units out of `full_scale` and mapped onto whatever
/// resolution the PWM channel has.
pub struct PwmHeater<P> {
    pwm: P,
    full_scale: u16,
    duty: u16,
}

impl<P: SetDutyCycle<Error = Infallible>> PwmHeater<P> {
    /// Create a new PWM heater output
    ///
    /// The output is forced off.
    ///
    /// # Arguments
    /// - `pwm`: PWM channel driving the heater MOSFET
    /// - `full_scale`: duty value meaning 100% on (must be non-zero)
    pub fn new(pwm: P, full_scale: u16) -> Self {
        let mut heater = Self {
            pwm,
            full_scale: full_scale.max(1),
            duty: 0,
        };
        heater.set_duty(0);
        heater
    }
}

impl<P: SetDutyCycle<Error = Infallible>> HeaterOutput for PwmHeater<P> {
    fn set_duty(&mut self, duty: u16) {
        let duty = duty.min(self.full_scale);
        self.duty = duty;
        self.pwm
            .set_duty_cycle_fraction(duty, self.full_scale)
            .unwrap_or_else(|never| match never {});
    }

    fn duty(&self) -> u16 {
        self.duty
    }
}

/// GPIO fan output
///
/// The pin can be configured as active-high (default) or active-low.
pub struct GpioFan<P> {
    pin: P,
    /// If true, fan ON = pin LOW
    inverted: bool,
    /// Current logical state (true = fan on)
    on: bool,
}

impl<P: OutputPin<Error = Infallible>> GpioFan<P> {
    /// Create a new GPIO fan output
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin to control
    /// - `inverted`: If true, fan is ON when pin is LOW
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut fan = Self {
            pin,
            inverted,
            on: false,
        };
        // Ensure fan starts off
        fan.set_on(false);
        fan
    }

    /// Create a new GPIO fan with active-high output
    pub fn new_active_high(pin: P) -> Self {
        Self::new(pin, false)
    }
}

impl<P: OutputPin<Error = Infallible>> FanOutput for GpioFan<P> {
    fn set_on(&mut self, on: bool) {
        self.on = on;

        let result = if on != self.inverted {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.unwrap_or_else(|never| match never {});
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType as PinErrorType;
    use embedded_hal::pwm::ErrorType as PwmErrorType;

    /// Mock PWM channel with 16-bit resolution
    struct MockPwm {
        duty: u16,
    }

    impl PwmErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.duty = duty;
            Ok(())
        }
    }

    /// Mock GPIO pin for testing
    struct MockPin {
        high: bool,
    }

    impl PinErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            Ok(())
        }
    }

    #[test]
    fn test_heater_starts_off() {
        let heater = PwmHeater::new(MockPwm { duty: 500 }, 255);
        assert_eq!(heater.duty(), 0);
        assert_eq!(heater.pwm.duty, 0);
    }

    #[test]
    fn test_heater_scales_duty() {
        let mut heater = PwmHeater::new(MockPwm { duty: 0 }, 255);
        heater.set_duty(255);
        assert_eq!(heater.pwm.duty, 1000);

        heater.set_duty(51);
        assert_eq!(heater.duty(), 51);
        assert_eq!(heater.pwm.duty, 200);

        heater.off();
        assert_eq!(heater.pwm.duty, 0);
    }

    #[test]
    fn test_heater_clamps_to_full_scale() {
        let mut heater = PwmHeater::new(MockPwm { duty: 0 }, 255);
        heater.set_duty(400);
        assert_eq!(heater.duty(), 255);
        assert_eq!(heater.pwm.duty, 1000);
    }

    #[test]
    fn test_active_high_fan() {
        let mut fan = GpioFan::new_active_high(MockPin { high: true });

        // Initially off
        assert!(!fan.is_on());
        assert!(!fan.pin.high);

        fan.set_on(true);
        assert!(fan.is_on());
        assert!(fan.pin.high);
    }

    #[test]
    fn test_active_low_fan() {
        let mut fan = GpioFan::new(MockPin { high: false }, true);

        // Initially off (pin is high for active-low)
        assert!(!fan.is_on());
        assert!(fan.pin.high);

        fan.set_on(true);
        assert!(!fan.pin.high);
    }
}

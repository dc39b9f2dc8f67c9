use embedded_hal::pwm::SetDutyCycle;


/// DC motor driven by a single PWM channel
pub struct MotorDriver<P> {
    name: &'static str,
    pwm: P,
    duty: u16,
}

impl<P: SetDutyCycle> MotorDriver<P> {
    pub fn new(name: &'static str, pwm: P) -> Self {
        Self { name, pwm, duty: 0 }
    }

    /// Apply a duty, effective immediately
    pub fn start(&mut self, duty: u16) {
        log::info!("{}: start motor, duty {}", self.name, duty);
        self.write(duty);
    }

    pub fn stop(&mut self) {
        log::debug!("{}: stop motor", self.name);
        self.write(0);
    }

    /// Last duty written (or attempted)
    pub fn duty(&self) -> u16 {
        self.duty
    }

    fn write(&mut self, duty: u16) {
        self.duty = duty;
        if let Err(err) = self.pwm.set_duty_cycle(duty) {
            log::error!("{}: failed to set duty {}: {:?}", self.name, duty, err);
        }
    }
}


#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    /// PWM channel recording every duty written
    #[derive(Clone, Default)]
    pub(crate) struct RecordingPwm {
        pub writes: Rc<RefCell<Vec<u16>>>,
    }

    impl embedded_hal::pwm::ErrorType for RecordingPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for RecordingPwm {
        fn max_duty_cycle(&self) -> u16 {
            255
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.writes.borrow_mut().push(duty);
            Ok(())
        }
    }

    #[test]
    fn start_and_stop() {
        let pwm = RecordingPwm::default();
        let mut motor = MotorDriver::new("feed", pwm.clone());
        motor.start(90);
        assert_eq!(motor.duty(), 90);
        motor.stop();
        assert_eq!(motor.duty(), 0);
        assert_eq!(*pwm.writes.borrow(), vec![90, 0]);
    }
}

use embedded_hal::pwm::SetDutyCycle;
use crate::{CommandResult, FlywheelConfig, Rejection};
use crate::motor::MotorDriver;

pub const SPEED_RANGE: (u32, u32) = (1, 10);
pub const SPIN_RANGE: (u32, u32) = (0, 10);
/// Spin value with no top/bottom bias
pub const SPIN_NEUTRAL: i32 = 5;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DutyPair {
    pub top: u16,
    pub bottom: u16,
}

/// Compute flywheel duties from a speed and a spin
///
/// Arguments are assumed to be in range.
pub fn mix(speed: u32, spin: u32, conf: &FlywheelConfig) -> DutyPair {
    let max = conf.max_duty as i32;
    let base = speed as i32 * max / 10;
    let spin_offset = spin as i32 - SPIN_NEUTRAL;
    let delta = base * spin_offset / conf.spin_divisor;
    DutyPair {
        top: (base + delta).clamp(0, max) as u16,
        bottom: (base - delta).clamp(0, max) as u16,
    }
}

fn check_range(param: &'static str, value: u32, (min, max): (u32, u32)) -> CommandResult {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Rejection::OutOfRange { param, value: value as i64, min: min as i64, max: max as i64 })
    }
}


/// Flywheel pair, as seen by the rest of the launcher
pub trait Flywheel: Send {
    fn set(&mut self, speed: u32, spin: u32) -> CommandResult;
    fn stop(&mut self);
}


/// Top and bottom flywheel motors driven together
pub struct FlywheelMixer<T, B> {
    top: MotorDriver<T>,
    bottom: MotorDriver<B>,
    conf: FlywheelConfig,
}

impl<T: SetDutyCycle, B: SetDutyCycle> FlywheelMixer<T, B> {
    pub fn new(top: T, bottom: B, conf: FlywheelConfig) -> Self {
        Self {
            top: MotorDriver::new("flywheel top", top),
            bottom: MotorDriver::new("flywheel bottom", bottom),
            conf,
        }
    }

    /// Start both flywheels
    ///
    /// Out of range values are rejected and motors are left untouched.
    pub fn set(&mut self, speed: u32, spin: u32) -> CommandResult {
        let checked = check_range("spin", spin, SPIN_RANGE)
            .and_then(|_| check_range("speed", speed, SPEED_RANGE));
        if let Err(rejection) = checked {
            log::warn!("flywheel: rejected: {}", rejection);
            return checked;
        }

        let duties = mix(speed, spin, &self.conf);
        log::info!("flywheel: speed {} spin {} -> top {} bottom {}", speed, spin, duties.top, duties.bottom);
        self.top.start(duties.top);
        self.bottom.start(duties.bottom);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.top.stop();
        self.bottom.stop();
    }

    pub fn duties(&self) -> DutyPair {
        DutyPair { top: self.top.duty(), bottom: self.bottom.duty() }
    }
}

impl<T, B> Flywheel for FlywheelMixer<T, B>
where
    T: SetDutyCycle + Send,
    B: SetDutyCycle + Send,
{
    fn set(&mut self, speed: u32, spin: u32) -> CommandResult {
        FlywheelMixer::set(self, speed, spin)
    }

    fn stop(&mut self) {
        FlywheelMixer::stop(self)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::tests::RecordingPwm;

    fn mixer() -> (FlywheelMixer<RecordingPwm, RecordingPwm>, RecordingPwm, RecordingPwm) {
        let top = RecordingPwm::default();
        let bottom = RecordingPwm::default();
        let mixer = FlywheelMixer::new(top.clone(), bottom.clone(), FlywheelConfig::default());
        (mixer, top, bottom)
    }

    #[test]
    fn spin_biases_top_and_bottom() {
        let (mut mixer, top, bottom) = mixer();
        assert_eq!(mixer.set(5, 7), Ok(()));
        assert_eq!(*top.writes.borrow(), vec![137]);
        assert_eq!(*bottom.writes.borrow(), vec![117]);
    }

    #[test]
    fn neutral_spin() {
        let conf = FlywheelConfig::default();
        for speed in 1..=10 {
            let duties = mix(speed, 5, &conf);
            assert_eq!(duties.top, duties.bottom);
            assert_eq!(duties.top as u32, speed * 255 / 10);
        }
    }

    #[test]
    fn duties_stay_in_range() {
        let conf = FlywheelConfig::default();
        for speed in 1..=10 {
            for spin in 0..=10 {
                let duties = mix(speed, spin, &conf);
                assert!(duties.top <= 255);
                assert!(duties.bottom <= 255);
            }
        }
        assert_eq!(mix(10, 10, &conf), DutyPair { top: 255, bottom: 204 });
        assert_eq!(mix(10, 0, &conf), DutyPair { top: 204, bottom: 255 });
    }

    #[test]
    fn out_of_range_is_rejected() {
        let (mut mixer, top, bottom) = mixer();
        assert!(matches!(mixer.set(11, 5), Err(Rejection::OutOfRange { param: "speed", .. })));
        assert!(matches!(mixer.set(0, 5), Err(Rejection::OutOfRange { param: "speed", .. })));
        assert!(matches!(mixer.set(5, 11), Err(Rejection::OutOfRange { param: "spin", .. })));
        assert!(top.writes.borrow().is_empty());
        assert!(bottom.writes.borrow().is_empty());
    }

    #[test]
    fn stop_both() {
        let (mut mixer, top, bottom) = mixer();
        mixer.set(8, 2).unwrap();
        mixer.stop();
        assert_eq!(mixer.duties(), DutyPair { top: 0, bottom: 0 });
        assert_eq!(top.writes.borrow().last(), Some(&0));
        assert_eq!(bottom.writes.borrow().last(), Some(&0));
    }
}

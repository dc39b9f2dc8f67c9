use embedded_hal::{delay::DelayNs, digital::OutputPin};


/// Rotation direction of a stepper
///
/// `Forward` is the clockwise direction, it increments the step counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Step counter increment for one pulse
    pub const fn sign(self) -> i32 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}


/// Low-level stepper driver
pub trait StepperDriver {
    fn set_direction(&mut self, direction: Direction);
    fn set_enabled(&mut self, enabled: bool);
    /// Emit one full step pulse, blocking for its duration
    fn pulse(&mut self);
}


/// STEP/DIR driver with an active-low enable line
pub struct PulseStepper<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
    half_period_us: u32,
}

impl<STEP, DIR, EN, D> PulseStepper<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    pub fn new(step: STEP, dir: DIR, enable: EN, delay: D, half_period_us: u32) -> Self {
        Self { step, dir, enable, delay, half_period_us }
    }
}

impl<STEP, DIR, EN, D> StepperDriver for PulseStepper<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    fn set_direction(&mut self, direction: Direction) {
        let result = match direction {
            Direction::Forward => self.dir.set_low(),
            Direction::Backward => self.dir.set_high(),
        };
        if let Err(err) = result {
            log::error!("stepper: failed to set direction: {:?}", err);
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        let result = if enabled { self.enable.set_low() } else { self.enable.set_high() };
        if let Err(err) = result {
            log::error!("stepper: failed to set enable line: {:?}", err);
        }
    }

    fn pulse(&mut self) {
        if let Err(err) = self.step.set_high() {
            log::error!("stepper: failed to raise step line: {:?}", err);
        }
        self.delay.delay_us(self.half_period_us);
        if let Err(err) = self.step.set_low() {
            log::error!("stepper: failed to lower step line: {:?}", err);
        }
        self.delay.delay_us(self.half_period_us);
    }
}

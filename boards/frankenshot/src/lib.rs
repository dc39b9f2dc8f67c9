use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    pwm::SetDutyCycle,
};

#[cfg(target_os = "espidf")]
mod esp;
#[cfg(target_os = "espidf")]
pub use esp::EspFrankenshotBoard;

#[cfg(not(target_os = "espidf"))]
pub mod sim;
#[cfg(not(target_os = "espidf"))]
pub use sim::SimFrankenshotBoard;


/// Pins of a STEP/DIR stepper driver
pub struct StepperPins<O> {
    pub step: O,
    pub dir: O,
    /// Active low
    pub enable: O,
}

pub struct FlywheelPwms<P> {
    pub top: P,
    pub bottom: P,
}


/// Hardware of the launcher
///
/// Getters hand each peripheral out once, then return `None`.
pub trait FrankenshotBoard {
    type Output: OutputPin + Send + 'static;
    type Input: InputPin + Send + 'static;
    type Pwm: SetDutyCycle + Send + 'static;
    type Delay: DelayNs + Send + 'static;

    /// Initialize the board, including logging
    fn init() -> Self;
    fn restart();

    fn pan_stepper(&mut self) -> Option<StepperPins<Self::Output>>;
    fn elevation_stepper(&mut self) -> Option<StepperPins<Self::Output>>;
    /// Pan limit switch, normally closed, high when pressed
    fn pan_switch(&mut self) -> Option<Self::Input>;
    /// Elevation limit switch, normally closed, high when pressed
    fn elevation_switch(&mut self) -> Option<Self::Input>;
    /// Feed switch, high while a ball is on it
    fn feed_switch(&mut self) -> Option<Self::Input>;
    fn feed_motor(&mut self) -> Option<Self::Pwm>;
    fn flywheel_motors(&mut self) -> Option<FlywheelPwms<Self::Pwm>>;
    /// Busy-wait delay used for step pulses
    fn delay(&self) -> Self::Delay;
}

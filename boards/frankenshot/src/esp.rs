use esp_idf_svc::hal::{
    delay::Ets,
    gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver, Pull},
    ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution},
    prelude::Peripherals,
    units::Hertz,
};
use crate::{FlywheelPwms, FrankenshotBoard, StepperPins};


pub type OutputPinDriver = PinDriver<'static, AnyOutputPin, Output>;
pub type InputPinDriver = PinDriver<'static, AnyInputPin, Input>;

/// PWM frequency of the DC motors
const MOTOR_PWM_FREQUENCY: Hertz = Hertz(20_000);


pub struct EspFrankenshotBoard {
    pan_stepper: Option<StepperPins<OutputPinDriver>>,
    elevation_stepper: Option<StepperPins<OutputPinDriver>>,
    pan_switch: Option<InputPinDriver>,
    elevation_switch: Option<InputPinDriver>,
    feed_switch: Option<InputPinDriver>,
    feed_motor: Option<LedcDriver<'static>>,
    flywheel_motors: Option<FlywheelPwms<LedcDriver<'static>>>,
    // H-bridge enable lines, kept high for the board lifetime
    _motor_enables: [OutputPinDriver; 3],
}

fn output(pin: impl Into<AnyOutputPin>) -> OutputPinDriver {
    PinDriver::output(pin.into()).unwrap()
}

/// Limit switch input, pulled up so that a cut wire reads as pressed
fn switch(pin: impl Into<AnyInputPin>) -> InputPinDriver {
    let mut driver = PinDriver::input(pin.into()).unwrap();
    driver.set_pull(Pull::Up).unwrap();
    driver
}

impl FrankenshotBoard for EspFrankenshotBoard {
    type Output = OutputPinDriver;
    type Input = InputPinDriver;
    type Pwm = LedcDriver<'static>;
    type Delay = Ets;

    fn init() -> Self {
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();

        let peripherals = Peripherals::take().unwrap();
        let pins = peripherals.pins;

        // Steppers
        let pan_stepper = StepperPins {
            step: output(pins.gpio46),
            dir: output(pins.gpio9),
            enable: output(pins.gpio3),
        };
        let elevation_stepper = StepperPins {
            step: output(pins.gpio16),
            dir: output(pins.gpio17),
            enable: output(pins.gpio15),
        };

        // Switches
        let feed_switch = switch(pins.gpio14);
        let pan_switch = switch(pins.gpio12);
        let elevation_switch = switch(pins.gpio13);

        // Motor H-bridges are always enabled, speed is set through PWM only
        let mut motor_enables = [output(pins.gpio20), output(pins.gpio45), output(pins.gpio37)];
        for enable in motor_enables.iter_mut() {
            enable.set_high().unwrap();
        }

        // Motors
        let motor_pwm = LedcTimerDriver::new(
            peripherals.ledc.timer0,
            &TimerConfig::new().frequency(MOTOR_PWM_FREQUENCY).resolution(Resolution::Bits8),
        ).unwrap();
        let feed_motor = LedcDriver::new(peripherals.ledc.channel0, &motor_pwm, pins.gpio19).unwrap();
        let flywheel_motors = FlywheelPwms {
            bottom: LedcDriver::new(peripherals.ledc.channel1, &motor_pwm, pins.gpio48).unwrap(),
            top: LedcDriver::new(peripherals.ledc.channel2, &motor_pwm, pins.gpio36).unwrap(),
        };

        Self {
            pan_stepper: Some(pan_stepper),
            elevation_stepper: Some(elevation_stepper),
            pan_switch: Some(pan_switch),
            elevation_switch: Some(elevation_switch),
            feed_switch: Some(feed_switch),
            feed_motor: Some(feed_motor),
            flywheel_motors: Some(flywheel_motors),
            _motor_enables: motor_enables,
        }
    }

    fn restart() {
        esp_idf_svc::hal::reset::restart();
    }

    fn pan_stepper(&mut self) -> Option<StepperPins<Self::Output>> {
        self.pan_stepper.take()
    }

    fn elevation_stepper(&mut self) -> Option<StepperPins<Self::Output>> {
        self.elevation_stepper.take()
    }

    fn pan_switch(&mut self) -> Option<Self::Input> {
        self.pan_switch.take()
    }

    fn elevation_switch(&mut self) -> Option<Self::Input> {
        self.elevation_switch.take()
    }

    fn feed_switch(&mut self) -> Option<Self::Input> {
        self.feed_switch.take()
    }

    fn feed_motor(&mut self) -> Option<Self::Pwm> {
        self.feed_motor.take()
    }

    fn flywheel_motors(&mut self) -> Option<FlywheelPwms<Self::Pwm>> {
        self.flywheel_motors.take()
    }

    fn delay(&self) -> Self::Delay {
        Ets
    }
}

//! Host simulator of the launcher mechanics
//!
//! Steppers move a simulated position on each STEP rising edge, limit switches
//! trigger on a zone of that position, and the feed switch is pressed once per
//! revolution of a cam turned by the feed motor.

use std::convert::Infallible;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;
use embedded_hal::{delay::DelayNs, digital, pwm};
use simple_logger::SimpleLogger;
use crate::{FlywheelPwms, FrankenshotBoard, StepperPins};

/// Cam samples per revolution
const FEED_CAM_REVOLUTION: u32 = 100;
/// Part of the cam revolution with the ball on the switch
const FEED_CAM_PRESSED: std::ops::Range<u32> = 40..60;


#[derive(Debug)]
struct AxisMechanics {
    position: i32,
    /// DIR line level
    dir_high: bool,
    /// Driver enable, active low
    enabled: bool,
    step_high: bool,
    switch_zone: RangeInclusive<i32>,
}

/// Simulated stepper-driven axis with its limit switch
#[derive(Clone, Debug)]
pub struct SimAxis(Arc<Mutex<AxisMechanics>>);

impl SimAxis {
    pub fn new(position: i32, switch_zone: RangeInclusive<i32>) -> Self {
        Self(Arc::new(Mutex::new(AxisMechanics {
            position,
            dir_high: false,
            enabled: false,
            step_high: false,
            switch_zone,
        })))
    }

    pub fn position(&self) -> i32 {
        self.lock().position
    }

    pub fn switch_pressed(&self) -> bool {
        let axis = self.lock();
        axis.switch_zone.contains(&axis.position)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AxisMechanics> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_line(&self, line: StepperLine, high: bool) {
        let mut axis = self.lock();
        match line {
            StepperLine::Step => {
                if high && !axis.step_high && axis.enabled {
                    axis.position += if axis.dir_high { -1 } else { 1 };
                }
                axis.step_high = high;
            }
            StepperLine::Dir => axis.dir_high = high,
            StepperLine::Enable => axis.enabled = !high,
        }
    }
}


#[derive(Clone, Copy, Debug)]
enum StepperLine {
    Step,
    Dir,
    Enable,
}

/// Output line of a simulated stepper driver
#[derive(Debug)]
pub struct SimOutputPin {
    axis: SimAxis,
    line: StepperLine,
}

impl digital::ErrorType for SimOutputPin {
    type Error = Infallible;
}

impl digital::OutputPin for SimOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.axis.set_line(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.axis.set_line(self.line, true);
        Ok(())
    }
}


/// Feed mechanism: the cam turns by one sample each time the switch is read
/// while the motor runs
#[derive(Clone, Debug)]
pub struct SimFeeder {
    motor: SimPwm,
    angle: Arc<AtomicU32>,
}

impl SimFeeder {
    fn read(&self) -> bool {
        let angle = if self.motor.duty() > 0 {
            self.angle.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.angle.load(Ordering::Relaxed)
        };
        FEED_CAM_PRESSED.contains(&(angle % FEED_CAM_REVOLUTION))
    }
}

#[derive(Debug)]
pub enum SimSwitch {
    Axis(SimAxis),
    Feed(SimFeeder),
}

impl digital::ErrorType for SimSwitch {
    type Error = Infallible;
}

impl digital::InputPin for SimSwitch {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(match self {
            Self::Axis(axis) => axis.switch_pressed(),
            Self::Feed(feeder) => feeder.read(),
        })
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}


/// 8-bit PWM channel
#[derive(Clone, Debug)]
pub struct SimPwm {
    name: &'static str,
    duty: Arc<AtomicU16>,
}

impl SimPwm {
    fn new(name: &'static str) -> Self {
        Self { name, duty: Arc::new(AtomicU16::new(0)) }
    }

    pub fn duty(&self) -> u16 {
        self.duty.load(Ordering::Relaxed)
    }
}

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let previous = self.duty.swap(duty, Ordering::Relaxed);
        if previous != duty {
            log::trace!("sim: {} duty {}", self.name, duty);
        }
        Ok(())
    }
}


#[derive(Clone, Copy, Debug, Default)]
pub struct SimDelay;

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns.into()));
    }
}


pub struct SimFrankenshotBoard {
    pan: SimAxis,
    elevation: SimAxis,
    pan_stepper: Option<StepperPins<SimOutputPin>>,
    elevation_stepper: Option<StepperPins<SimOutputPin>>,
    pan_switch: Option<SimSwitch>,
    elevation_switch: Option<SimSwitch>,
    feed_switch: Option<SimSwitch>,
    feed_motor: Option<SimPwm>,
    flywheel_motors: Option<FlywheelPwms<SimPwm>>,
}

fn stepper_pins(axis: &SimAxis) -> StepperPins<SimOutputPin> {
    let pin = |line| SimOutputPin { axis: axis.clone(), line };
    StepperPins {
        step: pin(StepperLine::Step),
        dir: pin(StepperLine::Dir),
        enable: pin(StepperLine::Enable),
    }
}

impl SimFrankenshotBoard {
    /// Board with both axes somewhere in their travel, away from the switches
    pub fn new() -> Self {
        // Pan switch is a short cam past the travel start
        let pan = SimAxis::new(-300, -40..=0);
        // Elevation switch is an end stop at the bottom
        let elevation = SimAxis::new(250, i32::MIN..=0);
        let feed_motor = SimPwm::new("feed");
        let feeder = SimFeeder { motor: feed_motor.clone(), angle: Arc::new(AtomicU32::new(0)) };

        Self {
            pan_stepper: Some(stepper_pins(&pan)),
            elevation_stepper: Some(stepper_pins(&elevation)),
            pan_switch: Some(SimSwitch::Axis(pan.clone())),
            elevation_switch: Some(SimSwitch::Axis(elevation.clone())),
            feed_switch: Some(SimSwitch::Feed(feeder)),
            feed_motor: Some(feed_motor),
            flywheel_motors: Some(FlywheelPwms {
                top: SimPwm::new("flywheel top"),
                bottom: SimPwm::new("flywheel bottom"),
            }),
            pan,
            elevation,
        }
    }

    /// Simulated pan position, in steps from the start position
    pub fn pan(&self) -> &SimAxis {
        &self.pan
    }

    pub fn elevation(&self) -> &SimAxis {
        &self.elevation
    }
}

impl Default for SimFrankenshotBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl FrankenshotBoard for SimFrankenshotBoard {
    type Output = SimOutputPin;
    type Input = SimSwitch;
    type Pwm = SimPwm;
    type Delay = SimDelay;

    fn init() -> Self {
        // Ignore failure, a logger may already be installed
        SimpleLogger::new().with_level(log::LevelFilter::Info).env().init().ok();
        log::info!("Simulated board");
        Self::new()
    }

    fn restart() {
        // Don't actually restart
        log::warn!("Restart requested");
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
        SimDelay
    }
}

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use embedded_hal::digital::InputPin;
use crate::{lock, AxisConfig, CommandResult, HomingMode, LimitPolicy, Rejection, TaskConfig};
use crate::debounce::DebouncedSwitch;
use crate::stepper::{Direction, StepperDriver};

/// Relative positions are given in tenths of the full travel
pub const RELATIVE_POSITION_MAX: u32 = 10;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisState {
    /// Stepping toward the limit switch
    HomingSeek,
    /// Switch found, stepping until it is released
    HomingWaitRelease,
    /// Zero found, moving to the middle of the travel
    HomingCenter,
    Ready,
    Moving,
    /// Homing failed, the axis will not move anymore
    Fault,
}

impl AxisState {
    /// True if the axis steps on each poll
    pub fn is_moving(self) -> bool {
        matches!(self, Self::Moving | Self::HomingCenter)
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HomingError {
    /// The limit switch did not trigger within the homing step limit
    SwitchNotFound { axis: &'static str, steps: u32 },
}

impl fmt::Display for HomingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchNotFound { axis, steps } => write!(f, "{axis}: limit switch not found after {steps} steps"),
        }
    }
}

impl std::error::Error for HomingError {}


/// Stepper axis with a limit switch
pub struct Axis<D, S> {
    conf: AxisConfig,
    driver: D,
    switch: DebouncedSwitch<S>,
    state: AxisState,
    step_counter: i32,
    target_steps: i32,
    direction: Direction,
    driver_enabled: bool,
    homing_steps: u32,
}

impl<D: StepperDriver, S: InputPin> Axis<D, S> {
    pub fn new(conf: AxisConfig, driver: D, switch: S) -> Self {
        Self {
            direction: conf.homing_direction,
            conf,
            driver,
            switch: DebouncedSwitch::new(switch),
            state: AxisState::HomingSeek,
            step_counter: 0,
            target_steps: 0,
            // Unknown line level, the first disable must be written
            driver_enabled: true,
            homing_steps: 0,
        }
    }

    /// Put the driver in a known state: disabled, homing direction
    pub fn init(&mut self) {
        self.set_driver_enabled(false);
        self.set_direction(self.conf.homing_direction);
        log::info!("{}: initialized", self.conf.name);
    }

    pub fn begin_homing(&mut self) {
        log::info!("{}: homing", self.conf.name);
        self.state = AxisState::HomingSeek;
        self.homing_steps = 0;
        self.set_direction(self.conf.homing_direction);
        self.set_driver_enabled(true);
    }

    /// Advance homing by one step
    ///
    /// Return `true` once the axis is homed.
    pub fn poll_homing(&mut self) -> Result<bool, HomingError> {
        match self.state {
            AxisState::HomingSeek => {
                match self.conf.homing_mode {
                    HomingMode::SeekAndRelease => {
                        self.homing_pulse()?;
                        if self.switch.pressed() {
                            log::info!("{}: limit switch pressed, waiting for release", self.conf.name);
                            self.state = AxisState::HomingWaitRelease;
                        }
                    }
                    HomingMode::SeekOnly => {
                        if self.switch.pressed() {
                            self.step_counter = 0;
                            self.target_steps = 0;
                            self.set_driver_enabled(false);
                            self.state = AxisState::Ready;
                            log::info!("{}: homed", self.conf.name);
                            return Ok(true);
                        }
                        self.homing_pulse()?;
                    }
                }
                Ok(false)
            }
            AxisState::HomingWaitRelease => {
                self.homing_pulse()?;
                if !self.switch.pressed() {
                    log::info!("{}: limit switch released, moving to center", self.conf.name);
                    self.step_counter = 0;
                    self.state = AxisState::Ready;
                    // Cannot fail, the axis is ready and the center is within travel
                    self.move_to_absolute(self.conf.total_steps / 2).ok();
                    self.state = AxisState::HomingCenter;
                }
                Ok(false)
            }
            AxisState::HomingCenter => {
                self.step();
                if self.state == AxisState::Ready {
                    log::info!("{}: homed", self.conf.name);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            AxisState::Ready | AxisState::Moving => Ok(true),
            AxisState::Fault => Err(HomingError::SwitchNotFound { axis: self.conf.name, steps: self.homing_steps }),
        }
    }

    /// Run the whole homing sequence, blocking
    pub fn home(&mut self) -> Result<(), HomingError> {
        self.begin_homing();
        while !self.poll_homing()? {}
        Ok(())
    }

    /// Request a move to a position given in tenths of the travel
    pub fn move_to_relative(&mut self, rel: u32) -> CommandResult {
        if rel > RELATIVE_POSITION_MAX {
            let rejection = Rejection::OutOfRange {
                param: "position",
                value: rel as i64,
                min: 0,
                max: RELATIVE_POSITION_MAX as i64,
            };
            log::warn!("{}: move rejected: {}", self.conf.name, rejection);
            return Err(rejection);
        }
        let target = rel as i32 * self.conf.total_steps / RELATIVE_POSITION_MAX as i32;
        self.move_to_absolute(target)
    }

    /// Request a move to an absolute step position
    ///
    /// The axis must be ready. The move starts on the next poll.
    pub fn move_to_absolute(&mut self, target: i32) -> CommandResult {
        if self.state != AxisState::Ready {
            let rejection = Rejection::NotReady(self.state);
            log::warn!("{}: move rejected: {}", self.conf.name, rejection);
            return Err(rejection);
        }
        if !(0..=self.conf.total_steps).contains(&target) {
            let rejection = Rejection::OutOfRange {
                param: "target",
                value: target as i64,
                min: 0,
                max: self.conf.total_steps as i64,
            };
            log::warn!("{}: move rejected: {}", self.conf.name, rejection);
            return Err(rejection);
        }

        let direction = if target >= self.step_counter { Direction::Forward } else { Direction::Backward };
        self.set_direction(direction);
        self.set_driver_enabled(true);
        self.target_steps = target;
        self.state = AxisState::Moving;
        log::info!("{}: moving from {} to {}", self.conf.name, self.step_counter, target);
        Ok(())
    }

    /// Motion task body, one step per call while moving
    pub fn poll(&mut self) -> AxisState {
        match self.state {
            AxisState::Moving | AxisState::HomingCenter => {
                self.set_driver_enabled(true);
                self.step();
            }
            AxisState::Ready => self.set_driver_enabled(false),
            _ => {}
        }
        self.state
    }

    fn step(&mut self) {
        self.driver.pulse();
        self.step_counter += self.direction.sign();
        log::trace!("{}: step {}", self.conf.name, self.step_counter);

        let total = self.conf.total_steps;
        if self.step_counter <= 0 || self.step_counter >= total {
            self.step_counter = self.step_counter.clamp(0, total);
            match self.conf.limit_policy {
                LimitPolicy::HardStop => {
                    if self.step_counter != self.target_steps {
                        log::warn!("{}: limit reached at {} before target {}", self.conf.name, self.step_counter, self.target_steps);
                    }
                    self.finish_move();
                    return;
                }
                LimitPolicy::SoftBounce => {
                    log::debug!("{}: limit reached at {}, reversing", self.conf.name, self.step_counter);
                    self.set_direction(self.direction.reversed());
                }
            }
        }

        if self.step_counter == self.target_steps {
            self.finish_move();
        }
    }

    fn finish_move(&mut self) {
        self.set_driver_enabled(false);
        self.state = AxisState::Ready;
        log::info!("{}: ready at {}", self.conf.name, self.step_counter);
    }

    fn homing_pulse(&mut self) -> Result<(), HomingError> {
        if self.homing_steps >= self.conf.homing_step_limit {
            self.set_driver_enabled(false);
            self.state = AxisState::Fault;
            let err = HomingError::SwitchNotFound { axis: self.conf.name, steps: self.homing_steps };
            log::error!("{}", err);
            return Err(err);
        }
        self.driver.pulse();
        self.homing_steps += 1;
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        self.driver.set_direction(direction);
    }

    fn set_driver_enabled(&mut self, enabled: bool) {
        if self.driver_enabled != enabled {
            self.driver.set_enabled(enabled);
            self.driver_enabled = enabled;
        }
    }

    pub fn name(&self) -> &'static str {
        self.conf.name
    }

    pub fn state(&self) -> AxisState {
        self.state
    }

    pub fn step_counter(&self) -> i32 {
        self.step_counter
    }

    pub fn target_steps(&self) -> i32 {
        self.target_steps
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn driver_enabled(&self) -> bool {
        self.driver_enabled
    }
}


/// Type-erased axis, shared between its task and the sequencer
pub trait AxisControl: Send {
    fn name(&self) -> &'static str;
    fn state(&self) -> AxisState;
    fn step_counter(&self) -> i32;
    fn init(&mut self);
    fn begin_homing(&mut self);
    fn poll_homing(&mut self) -> Result<bool, HomingError>;
    fn move_to_relative(&mut self, rel: u32) -> CommandResult;
    fn poll(&mut self) -> AxisState;
}

impl<D, S> AxisControl for Axis<D, S>
where
    D: StepperDriver + Send,
    S: InputPin + Send,
{
    fn name(&self) -> &'static str { Axis::name(self) }
    fn state(&self) -> AxisState { Axis::state(self) }
    fn step_counter(&self) -> i32 { Axis::step_counter(self) }
    fn init(&mut self) { Axis::init(self) }
    fn begin_homing(&mut self) { Axis::begin_homing(self) }
    fn poll_homing(&mut self) -> Result<bool, HomingError> { Axis::poll_homing(self) }
    fn move_to_relative(&mut self, rel: u32) -> CommandResult { Axis::move_to_relative(self, rel) }
    fn poll(&mut self) -> AxisState { Axis::poll(self) }
}


/// Shared handle on an axis
#[derive(Clone)]
pub struct AxisHandle {
    name: &'static str,
    axis: Arc<Mutex<dyn AxisControl>>,
}

impl AxisHandle {
    pub fn new<A: AxisControl + 'static>(axis: A) -> Self {
        Self {
            name: axis.name(),
            axis: Arc::new(Mutex::new(axis)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn init(&self) {
        lock(&self.axis).init();
    }

    /// Home the axis, blocking the caller until done
    ///
    /// The lock is released between steps.
    pub fn home(&self) -> Result<(), HomingError> {
        lock(&self.axis).begin_homing();
        loop {
            if lock(&self.axis).poll_homing()? {
                return Ok(());
            }
        }
    }

    pub fn move_to_relative(&self, rel: u32) -> CommandResult {
        lock(&self.axis).move_to_relative(rel)
    }

    pub fn state(&self) -> AxisState {
        lock(&self.axis).state()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == AxisState::Ready
    }

    pub fn step_counter(&self) -> i32 {
        lock(&self.axis).step_counter()
    }

    /// Start the motion task
    pub fn spawn(&self, tasks: &TaskConfig) -> io::Result<JoinHandle<()>> {
        let axis = self.axis.clone();
        let idle_period = tasks.axis_idle_period;
        thread::Builder::new()
            .name(format!("{}-axis", self.name))
            .stack_size(tasks.stack_size)
            .spawn(move || loop {
                let state = lock(&axis).poll();
                if state.is_moving() {
                    thread::yield_now();
                } else {
                    thread::sleep(idle_period);
                }
            })
    }
}

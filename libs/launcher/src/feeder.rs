use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use embedded_hal::{digital::InputPin, pwm::SetDutyCycle};
use crate::{FeedConfig, TaskConfig};
use crate::debounce::DebouncedSwitch;
use crate::motor::MotorDriver;


#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedState {
    Idle = 0,
    /// Switch was pressed when the push started, wait for it to be released
    ClearingSwitch = 1,
    /// Pushing the ball toward the switch
    Running = 2,
    /// Ball is on the switch, wait for it to pass
    WaitingRelease = 3,
    /// Jammed, only a restart leaves this state
    Error = 4,
}

impl FeedState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::ClearingSwitch,
            2 => Self::Running,
            3 => Self::WaitingRelease,
            _ => Self::Error,
        }
    }
}


#[derive(Debug)]
struct FeedStatus {
    requested: AtomicBool,
    state: AtomicU8,
}

/// Feeder side visible from other tasks
#[derive(Clone, Debug)]
pub struct FeedHandle(Arc<FeedStatus>);

impl FeedHandle {
    /// Ask for one ball to be pushed
    ///
    /// Requests are latched, asking again while pending has no effect.
    pub fn request_feed(&self) {
        if !self.0.requested.swap(true, Ordering::AcqRel) {
            log::debug!("feed: requested");
        }
    }

    /// True while a requested push is not completed, unless jammed
    pub fn is_pending(&self) -> bool {
        self.0.requested.load(Ordering::Acquire) && !self.is_jammed()
    }

    pub fn is_jammed(&self) -> bool {
        self.state() == FeedState::Error
    }

    pub fn state(&self) -> FeedState {
        FeedState::from_u8(self.0.state.load(Ordering::Acquire))
    }
}


/// Feed mechanism: a DC motor pushing balls past a switch
pub struct Feeder<P, S> {
    motor: MotorDriver<P>,
    switch: DebouncedSwitch<S>,
    conf: FeedConfig,
    state: FeedState,
    state_entered_at: Instant,
    status: Arc<FeedStatus>,
}

impl<P: SetDutyCycle, S: InputPin> Feeder<P, S> {
    pub fn new(motor: P, switch: S, conf: FeedConfig) -> Self {
        Self {
            motor: MotorDriver::new("feed", motor),
            switch: DebouncedSwitch::new(switch),
            conf,
            state: FeedState::Idle,
            state_entered_at: Instant::now(),
            status: Arc::new(FeedStatus {
                requested: AtomicBool::new(false),
                state: AtomicU8::new(FeedState::Idle as u8),
            }),
        }
    }

    pub fn handle(&self) -> FeedHandle {
        FeedHandle(self.status.clone())
    }

    pub fn init(&mut self) {
        self.motor.stop();
        log::info!("feed: initialized");
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    /// Run one iteration of the feed state machine
    pub fn update(&mut self, now: Instant) -> FeedState {
        let pressed = self.switch.pressed();
        let timed_out = now.saturating_duration_since(self.state_entered_at) >= self.conf.jam_timeout;

        match self.state {
            FeedState::Idle => {
                if self.status.requested.load(Ordering::Acquire) {
                    self.motor.start(self.conf.duty);
                    let next = if pressed { FeedState::ClearingSwitch } else { FeedState::Running };
                    self.set_state(next, now);
                }
            }
            FeedState::ClearingSwitch => {
                if !pressed {
                    self.set_state(FeedState::Running, now);
                } else if timed_out {
                    self.jam(now);
                }
            }
            FeedState::Running => {
                if pressed {
                    self.set_state(FeedState::WaitingRelease, now);
                } else if timed_out {
                    self.jam(now);
                }
            }
            FeedState::WaitingRelease => {
                if !pressed {
                    self.motor.stop();
                    self.set_state(FeedState::Idle, now);
                    self.status.requested.store(false, Ordering::Release);
                    log::info!("feed: ball pushed");
                }
            }
            FeedState::Error => {
                self.motor.stop();
            }
        }

        self.state
    }

    fn jam(&mut self, now: Instant) {
        self.motor.stop();
        log::error!("feed: jammed in state {:?}, no switch transition for {:?}", self.state, self.conf.jam_timeout);
        self.set_state(FeedState::Error, now);
    }

    fn set_state(&mut self, state: FeedState, now: Instant) {
        log::info!("feed: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.state_entered_at = now;
        self.status.state.store(state as u8, Ordering::Release);
    }
}


/// Feeder waiting for its task to be started
pub trait FeedTask: Send {
    fn handle(&self) -> FeedHandle;
    fn init(&mut self);
    fn spawn(self: Box<Self>, tasks: &TaskConfig) -> io::Result<JoinHandle<()>>;
}

impl<P, S> FeedTask for Feeder<P, S>
where
    P: SetDutyCycle + Send + 'static,
    S: InputPin + Send + 'static,
{
    fn handle(&self) -> FeedHandle {
        Feeder::handle(self)
    }

    fn init(&mut self) {
        Feeder::init(self)
    }

    fn spawn(self: Box<Self>, tasks: &TaskConfig) -> io::Result<JoinHandle<()>> {
        let mut feeder = *self;
        let period = feeder.conf.poll_period;
        thread::Builder::new()
            .name("feed".into())
            .stack_size(tasks.stack_size)
            .spawn(move || loop {
                feeder.update(Instant::now());
                thread::sleep(period);
            })
    }
}

use std::io;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use crate::{lock, CommandResult, SequencerConfig, TaskConfig};
use crate::axis::{AxisControl, AxisHandle, AxisState, HomingError};
use crate::feeder::{FeedHandle, FeedState, FeedTask};
use crate::mixer::Flywheel;
use crate::program::ProgramStore;
use crate::sequencer::{Sequencer, ShotHardware};


/// The whole launcher: two axes, the flywheels and the feeder
///
/// Startup order is `init_all_actuators()`, `home_pan()`, `home_elevation()`
/// then `start_tasks()`.
pub struct Launcher {
    pan: AxisHandle,
    elevation: AxisHandle,
    flywheel: Arc<Mutex<dyn Flywheel>>,
    feed: FeedHandle,
    feeder: Option<Box<dyn FeedTask>>,
    tasks: TaskConfig,
}

impl Launcher {
    pub fn new<P, E, F, W>(pan: P, elevation: E, feeder: F, flywheel: W, tasks: TaskConfig) -> Self
    where
        P: AxisControl + 'static,
        E: AxisControl + 'static,
        F: FeedTask + 'static,
        W: Flywheel + 'static,
    {
        Self {
            pan: AxisHandle::new(pan),
            elevation: AxisHandle::new(elevation),
            flywheel: Arc::new(Mutex::new(flywheel)),
            feed: feeder.handle(),
            feeder: Some(Box::new(feeder)),
            tasks,
        }
    }

    pub fn handle(&self) -> LauncherHandle {
        LauncherHandle {
            pan: self.pan.clone(),
            elevation: self.elevation.clone(),
            flywheel: self.flywheel.clone(),
            feed: self.feed.clone(),
        }
    }

    /// Put every actuator in a safe state: motors stopped, steppers disabled
    pub fn init_all_actuators(&mut self) {
        log::info!("Initialize actuators");
        lock(&self.flywheel).stop();
        if let Some(feeder) = self.feeder.as_mut() {
            feeder.init();
        }
        self.pan.init();
        self.elevation.init();
    }

    pub fn home_pan(&self) -> Result<(), HomingError> {
        self.pan.home()
    }

    pub fn home_elevation(&self) -> Result<(), HomingError> {
        self.elevation.home()
    }

    /// Start the feed task and both axis tasks
    pub fn start_tasks(&mut self) -> io::Result<()> {
        let Some(feeder) = self.feeder.take() else {
            log::warn!("Tasks already started");
            return Ok(());
        };
        log::info!("Start actuator tasks");
        feeder.spawn(&self.tasks)?;
        self.pan.spawn(&self.tasks)?;
        self.elevation.spawn(&self.tasks)?;
        Ok(())
    }

    /// Start a sequencer task walking the given program
    pub fn spawn_sequencer(&self, program: Arc<ProgramStore>, conf: SequencerConfig) -> io::Result<JoinHandle<()>> {
        Sequencer::new(self.handle(), program, conf).spawn(&self.tasks)
    }
}


/// Request side of the launcher, cheap to clone and shared between tasks
#[derive(Clone)]
pub struct LauncherHandle {
    pan: AxisHandle,
    elevation: AxisHandle,
    flywheel: Arc<Mutex<dyn Flywheel>>,
    feed: FeedHandle,
}

impl LauncherHandle {
    pub fn request_feed(&self) {
        self.feed.request_feed();
    }

    pub fn is_feed_pending(&self) -> bool {
        self.feed.is_pending()
    }

    pub fn is_feed_jammed(&self) -> bool {
        self.feed.is_jammed()
    }

    pub fn feed_state(&self) -> FeedState {
        self.feed.state()
    }

    pub fn is_pan_ready(&self) -> bool {
        self.pan.is_ready()
    }

    pub fn is_elevation_ready(&self) -> bool {
        self.elevation.is_ready()
    }

    pub fn pan_state(&self) -> AxisState {
        self.pan.state()
    }

    pub fn elevation_state(&self) -> AxisState {
        self.elevation.state()
    }

    /// Current pan and elevation step counters
    pub fn position(&self) -> (i32, i32) {
        (self.pan.step_counter(), self.elevation.step_counter())
    }

    pub fn move_pan_to_relative(&self, rel: u32) -> CommandResult {
        self.pan.move_to_relative(rel)
    }

    pub fn move_elevation_to_relative(&self, rel: u32) -> CommandResult {
        self.elevation.move_to_relative(rel)
    }

    pub fn set_flywheel(&self, speed: u32, spin: u32) -> CommandResult {
        lock(&self.flywheel).set(speed, spin)
    }

    pub fn stop_flywheel(&self) {
        lock(&self.flywheel).stop();
    }
}

impl ShotHardware for LauncherHandle {
    fn move_pan_to_relative(&self, rel: u32) -> CommandResult { LauncherHandle::move_pan_to_relative(self, rel) }
    fn move_elevation_to_relative(&self, rel: u32) -> CommandResult { LauncherHandle::move_elevation_to_relative(self, rel) }
    fn is_pan_ready(&self) -> bool { LauncherHandle::is_pan_ready(self) }
    fn is_elevation_ready(&self) -> bool { LauncherHandle::is_elevation_ready(self) }
    fn set_flywheel(&self, speed: u32, spin: u32) -> CommandResult { LauncherHandle::set_flywheel(self, speed, spin) }
    fn stop_flywheel(&self) { LauncherHandle::stop_flywheel(self) }
    fn request_feed(&self) { LauncherHandle::request_feed(self) }
    fn is_feed_pending(&self) -> bool { LauncherHandle::is_feed_pending(self) }
    fn is_feed_jammed(&self) -> bool { LauncherHandle::is_feed_jammed(self) }
}

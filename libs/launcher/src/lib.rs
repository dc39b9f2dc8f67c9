//! Actuator control for the Frankenshot ball launcher
//!
//! Hardware is reached through `embedded-hal` traits, so the same state
//! machines run on the ESP32 board and on the host simulator.

pub mod axis;
pub mod conf;
pub mod debounce;
pub mod feeder;
pub mod launcher;
pub mod mixer;
pub mod motor;
pub mod program;
pub mod sequencer;
pub mod stepper;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub use axis::{Axis, AxisHandle, AxisState, HomingError};
pub use conf::*;
pub use feeder::{FeedHandle, FeedState, Feeder};
pub use launcher::{Launcher, LauncherHandle};
pub use mixer::{DutyPair, FlywheelMixer};
pub use program::{Program, ProgramStore, ShotConfig};
pub use sequencer::{Sequencer, SequencerState, ShotHardware};
pub use stepper::{Direction, PulseStepper, StepperDriver};


/// Reason for a command to be ignored
///
/// Rejected commands leave the actuator untouched; the rejection is also logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A parameter is outside its valid range
    OutOfRange { param: &'static str, value: i64, min: i64, max: i64 },
    /// The axis is not able to accept a move in its current state
    NotReady(AxisState),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { param, value, min, max } => write!(f, "{param} {value} out of range [{min}, {max}]"),
            Self::NotReady(state) => write!(f, "axis not ready (state: {state:?})"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Result of an actuator command
pub type CommandResult = Result<(), Rejection>;


/// Lock a mutex, ignoring poisoning
///
/// Actuator state stays consistent between two polls, so a panic in another
/// task must not take the whole machine down.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

use launcher::{AxisConfig, FeedConfig, FlywheelConfig, SequencerConfig, ShotConfig, TaskConfig};


pub struct LauncherConfig {
    pub pan: AxisConfig,
    pub elevation: AxisConfig,
    pub feed: FeedConfig,
    pub flywheel: FlywheelConfig,
    pub sequencer: SequencerConfig,
    pub tasks: TaskConfig,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            pan: AxisConfig::pan(),
            elevation: AxisConfig::elevation(),
            feed: FeedConfig::default(),
            flywheel: FlywheelConfig::default(),
            sequencer: SequencerConfig::default(),
            tasks: TaskConfig::default(),
        }
    }
}


/// Program loaded at boot
///
/// Consecutive shots, last to first included, never share a pan or elevation
/// position: a move to the current position runs the axis to its limit.
pub static DEFAULT_PROGRAM: [ShotConfig; 4] = [
    //              speed spin pan elev delay
    ShotConfig::new(5,    5,   5,  5,   4),
    ShotConfig::new(6,    7,   2,  4,   4),
    ShotConfig::new(6,    3,   8,  6,   4),
    ShotConfig::new(8,    5,   3,  3,   6),
];


/// What the firmware does after boot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootMode {
    /// Home, then run the program
    Run,
    /// Feed motor on and off, forever
    FeedMotorCycle,
    /// Log switch changes, forever
    SwitchMonitor,
    /// Home, then exercise each actuator once
    SmokeTest,
}

impl BootMode {
    const ENV_VAR: &'static str = "FRANKENSHOT_MODE";

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "run" => Some(Self::Run),
            "feed-motor-cycle" => Some(Self::FeedMotorCycle),
            "switch-monitor" => Some(Self::SwitchMonitor),
            "smoke-test" => Some(Self::SmokeTest),
            _ => None,
        }
    }

    /// Read the mode from the environment, or from the build environment
    pub fn from_env() -> Self {
        let value = std::env::var(Self::ENV_VAR).ok()
            .or_else(|| option_env!("FRANKENSHOT_MODE").map(String::from));
        match value {
            None => Self::Run,
            Some(value) => Self::parse(&value).unwrap_or_else(|| {
                log::warn!("Unknown boot mode {value:?}, using run mode");
                Self::Run
            }),
        }
    }
}

/// Whether the program starts right after boot
pub fn feeding_at_boot() -> bool {
    !matches!(std::env::var("FRANKENSHOT_FEEDING").as_deref(), Ok("0"))
}

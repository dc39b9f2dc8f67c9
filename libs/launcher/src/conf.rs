use core::time::Duration;
use crate::stepper::Direction;


/// What an axis does when its step counter reaches an end of travel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitPolicy {
    /// Stop at the limit and report ready, even if the target is not reached
    HardStop,
    /// Reverse direction at the limit and keep moving until the target is reached
    SoftBounce,
}

/// Homing sequence used to find the zero position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HomingMode {
    /// Zero is set when the switch is released, then the axis is centered
    SeekAndRelease,
    /// Zero is set as soon as the switch is pressed
    SeekOnly,
}


#[derive(Clone, Debug)]
pub struct AxisConfig {
    /// Name used in logs
    pub name: &'static str,
    /// Number of steps from one end of travel to the other
    pub total_steps: i32,
    pub limit_policy: LimitPolicy,
    pub homing_mode: HomingMode,
    /// Direction used while seeking the limit switch
    pub homing_direction: Direction,
    /// Maximum number of homing steps before the switch is declared missing
    pub homing_step_limit: u32,
    /// Half period of a step pulse, in microseconds
    pub step_delay_us: u32,
}

impl AxisConfig {
    /// Horizontal axis, stops hard at its limits
    pub const fn pan() -> Self {
        Self {
            name: "pan",
            total_steps: 2800,
            limit_policy: LimitPolicy::HardStop,
            homing_mode: HomingMode::SeekAndRelease,
            homing_direction: Direction::Forward,
            homing_step_limit: 2 * 2800,
            step_delay_us: 800,
        }
    }

    /// Vertical axis, bounces at its limits
    pub const fn elevation() -> Self {
        Self {
            name: "elevation",
            total_steps: 800,
            limit_policy: LimitPolicy::SoftBounce,
            homing_mode: HomingMode::SeekOnly,
            homing_direction: Direction::Backward,
            homing_step_limit: 2 * 800,
            step_delay_us: 2000,
        }
    }
}


#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// PWM duty applied to the feed motor while pushing a ball
    pub duty: u16,
    /// Feed task poll period
    pub poll_period: Duration,
    /// Maximum time to wait for an expected switch transition
    pub jam_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            duty: 90,
            poll_period: Duration::from_millis(10),
            jam_timeout: Duration::from_millis(10_000),
        }
    }
}


#[derive(Clone, Debug)]
pub struct FlywheelConfig {
    /// Maximum PWM duty (8-bit resolution)
    pub max_duty: u16,
    /// Spin effect divisor, higher means weaker spin
    pub spin_divisor: i32,
}

impl Default for FlywheelConfig {
    fn default() -> Self {
        Self {
            max_duty: 255,
            spin_divisor: 25,
        }
    }
}


#[derive(Clone, Debug)]
pub struct SequencerConfig {
    /// Tick while paused or halted
    pub pause_tick: Duration,
    /// Tick while waiting for axes or feeder
    pub wait_tick: Duration,
    /// Tick of the inter-shot delay
    pub delay_tick: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            pause_tick: Duration::from_millis(100),
            wait_tick: Duration::from_millis(10),
            delay_tick: Duration::from_millis(100),
        }
    }
}


#[derive(Clone, Debug)]
pub struct TaskConfig {
    /// Axis task poll period when not moving
    pub axis_idle_period: Duration,
    /// Stack size of each spawned task
    pub stack_size: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            axis_idle_period: Duration::from_millis(100),
            stack_size: 8 * 1024,
        }
    }
}

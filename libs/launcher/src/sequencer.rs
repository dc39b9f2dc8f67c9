use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crate::{CommandResult, SequencerConfig, TaskConfig};
use crate::program::{ProgramStore, ShotConfig};


/// Actuator requests available to the sequencer
///
/// The sequencer never drives a motor itself, it only posts requests and
/// polls their status.
pub trait ShotHardware {
    fn move_pan_to_relative(&self, rel: u32) -> CommandResult;
    fn move_elevation_to_relative(&self, rel: u32) -> CommandResult;
    fn is_pan_ready(&self) -> bool;
    fn is_elevation_ready(&self) -> bool;
    fn set_flywheel(&self, speed: u32, spin: u32) -> CommandResult;
    fn stop_flywheel(&self);
    fn request_feed(&self);
    fn is_feed_pending(&self) -> bool;
    fn is_feed_jammed(&self) -> bool;
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    /// Next step is to start the shot under the cursor
    Idle,
    /// Waiting for both axes to reach the shot position
    Positioning { index: usize, shot: ShotConfig },
    /// Waiting for the feeder to push the ball
    Feeding { index: usize, shot: ShotConfig },
    /// Delay after a shot
    Waiting { index: usize, until: Instant },
    /// Feeder jammed, nothing will be shot anymore
    Halted,
}


/// Walk the program, one shot after the other
pub struct Sequencer<H> {
    hardware: H,
    program: Arc<ProgramStore>,
    conf: SequencerConfig,
    state: SequencerState,
    paused: bool,
}

impl<H: ShotHardware> Sequencer<H> {
    pub fn new(hardware: H, program: Arc<ProgramStore>, conf: SequencerConfig) -> Self {
        Self {
            hardware,
            program,
            conf,
            state: SequencerState::Idle,
            paused: false,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Advance the state machine, return the time to wait before the next tick
    pub fn tick(&mut self, now: Instant) -> Duration {
        match self.state {
            SequencerState::Halted => {
                self.hardware.stop_flywheel();
                return self.conf.pause_tick;
            }
            // A started push cannot be interrupted
            SequencerState::Feeding { index, shot } => return self.poll_feed(now, index, shot),
            _ => {}
        }

        if !self.program.feeding_enabled() || self.program.is_empty() {
            if let SequencerState::Waiting { index, .. } = self.state {
                self.program.advance_from(index);
            }
            if !self.paused {
                log::info!("sequencer: paused");
                self.paused = true;
            }
            self.hardware.stop_flywheel();
            self.state = SequencerState::Idle;
            return self.conf.pause_tick;
        }
        if self.paused {
            log::info!("sequencer: resumed");
            self.paused = false;
        }

        loop {
            match self.state {
                SequencerState::Idle => {
                    let Some((index, shot)) = self.program.active_shot() else {
                        return self.conf.pause_tick;
                    };
                    log::info!("sequencer: shot {}: {:?}", index, shot);
                    // Rejections are logged by the actuators, the shot goes on
                    self.hardware.move_pan_to_relative(shot.pan.into()).ok();
                    self.hardware.move_elevation_to_relative(shot.elevation.into()).ok();
                    self.hardware.set_flywheel(shot.speed.into(), shot.spin.into()).ok();
                    self.state = SequencerState::Positioning { index, shot };
                }
                SequencerState::Positioning { index, shot } => {
                    if !(self.hardware.is_pan_ready() && self.hardware.is_elevation_ready()) {
                        return self.conf.wait_tick;
                    }
                    log::debug!("sequencer: in position, feeding");
                    self.hardware.request_feed();
                    self.state = SequencerState::Feeding { index, shot };
                    return self.conf.wait_tick;
                }
                SequencerState::Waiting { index, until } => {
                    if now < until {
                        return self.delay_tick(now, until);
                    }
                    self.program.advance_from(index);
                    self.state = SequencerState::Idle;
                }
                SequencerState::Feeding { .. } | SequencerState::Halted => return self.conf.wait_tick,
            }
        }
    }

    fn poll_feed(&mut self, now: Instant, index: usize, shot: ShotConfig) -> Duration {
        if self.hardware.is_feed_jammed() {
            log::error!("sequencer: feeder jammed, halting");
            self.hardware.stop_flywheel();
            self.state = SequencerState::Halted;
            return self.conf.pause_tick;
        }
        if self.hardware.is_feed_pending() {
            return self.conf.wait_tick;
        }

        self.program.publish_shot(index);
        log::info!("sequencer: shot {} done, waiting {} s", index, shot.delay_secs);
        let until = now + Duration::from_secs(shot.delay_secs.into());
        self.state = SequencerState::Waiting { index, until };
        self.delay_tick(now, until)
    }

    fn delay_tick(&self, now: Instant, until: Instant) -> Duration {
        until.saturating_duration_since(now).min(self.conf.delay_tick)
    }

    /// Run forever, one sleep per tick
    pub fn run(mut self) {
        log::info!("sequencer: started");
        loop {
            let tick = self.tick(Instant::now());
            thread::sleep(tick);
        }
    }
}

impl<H: ShotHardware + Send + 'static> Sequencer<H> {
    pub fn spawn(self, tasks: &TaskConfig) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("sequencer".into())
            .stack_size(tasks.stack_size)
            .spawn(move || self.run())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use crate::program::Program;

    #[derive(Debug, PartialEq)]
    enum Call {
        Pan(u32),
        Elevation(u32),
        Flywheel(u32, u32),
        FlywheelStop,
        Feed,
    }

    #[derive(Default)]
    struct FakeHardware {
        pan_ready: Cell<bool>,
        elevation_ready: Cell<bool>,
        feed_pending: Cell<bool>,
        jammed: Cell<bool>,
        calls: RefCell<Vec<Call>>,
    }

    impl FakeHardware {
        fn set_ready(&self, ready: bool) {
            self.pan_ready.set(ready);
            self.elevation_ready.set(ready);
        }

        fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
            self.calls.borrow().iter().filter(|c| f(c)).count()
        }

        fn last_flywheel(&self) -> Option<Call> {
            self.calls.borrow().iter().rev().find_map(|c| match c {
                Call::Flywheel(speed, spin) => Some(Call::Flywheel(*speed, *spin)),
                Call::FlywheelStop => Some(Call::FlywheelStop),
                _ => None,
            })
        }
    }

    impl ShotHardware for FakeHardware {
        fn move_pan_to_relative(&self, rel: u32) -> CommandResult {
            self.calls.borrow_mut().push(Call::Pan(rel));
            Ok(())
        }

        fn move_elevation_to_relative(&self, rel: u32) -> CommandResult {
            self.calls.borrow_mut().push(Call::Elevation(rel));
            Ok(())
        }

        fn is_pan_ready(&self) -> bool {
            self.pan_ready.get()
        }

        fn is_elevation_ready(&self) -> bool {
            self.elevation_ready.get()
        }

        fn set_flywheel(&self, speed: u32, spin: u32) -> CommandResult {
            self.calls.borrow_mut().push(Call::Flywheel(speed, spin));
            Ok(())
        }

        fn stop_flywheel(&self) {
            self.calls.borrow_mut().push(Call::FlywheelStop);
        }

        fn request_feed(&self) {
            self.feed_pending.set(true);
            self.calls.borrow_mut().push(Call::Feed);
        }

        fn is_feed_pending(&self) -> bool {
            self.feed_pending.get() && !self.jammed.get()
        }

        fn is_feed_jammed(&self) -> bool {
            self.jammed.get()
        }
    }

    fn sequencer(shots: Vec<ShotConfig>) -> (Sequencer<FakeHardware>, Arc<ProgramStore>) {
        let program = Arc::new(ProgramStore::new(Program::new(shots), true));
        let sequencer = Sequencer::new(FakeHardware::default(), program.clone(), SequencerConfig::default());
        (sequencer, program)
    }

    fn two_shots() -> Vec<ShotConfig> {
        vec![ShotConfig::new(5, 7, 7, 5, 1), ShotConfig::new(3, 5, 2, 9, 0)]
    }

    /// Bring the sequencer to the feeding step of the current shot
    fn to_feeding(sequencer: &mut Sequencer<FakeHardware>, now: Instant) {
        sequencer.hardware().set_ready(true);
        sequencer.tick(now);
        assert!(matches!(sequencer.state(), SequencerState::Feeding { .. }));
    }

    #[test]
    fn full_cycle() {
        let (mut sequencer, program) = sequencer(two_shots());
        let t0 = Instant::now();

        assert_eq!(sequencer.tick(t0), Duration::from_millis(10));
        assert!(matches!(sequencer.state(), SequencerState::Positioning { index: 0, .. }));
        assert_eq!(
            *sequencer.hardware().calls.borrow(),
            vec![Call::Pan(7), Call::Elevation(5), Call::Flywheel(5, 7)],
        );

        // Axes still moving
        assert_eq!(sequencer.tick(t0), Duration::from_millis(10));
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Feed), 0);

        sequencer.hardware().set_ready(true);
        assert_eq!(sequencer.tick(t0), Duration::from_millis(10));
        assert!(matches!(sequencer.state(), SequencerState::Feeding { index: 0, .. }));
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Feed), 1);

        // Feeder busy
        assert_eq!(sequencer.tick(t0), Duration::from_millis(10));
        assert_eq!(program.last_shot(), None);

        sequencer.hardware().feed_pending.set(false);
        let t1 = t0 + Duration::from_millis(500);
        assert_eq!(sequencer.tick(t1), Duration::from_millis(100));
        assert_eq!(program.last_shot(), Some(0));
        assert_eq!(program.current_index(), 0);

        assert_eq!(sequencer.tick(t1 + Duration::from_millis(950)), Duration::from_millis(50));
        assert!(matches!(sequencer.state(), SequencerState::Waiting { index: 0, .. }));

        // Delay over: next shot is started in the same tick
        sequencer.tick(t1 + Duration::from_secs(1));
        assert_eq!(program.current_index(), 1);
        assert!(matches!(sequencer.state(), SequencerState::Feeding { index: 1, .. }));
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Pan(2)), 1);
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Elevation(9)), 1);
    }

    #[test]
    fn zero_delay_does_not_wait() {
        let (mut sequencer, program) = sequencer(vec![ShotConfig::new(3, 5, 2, 9, 0)]);
        let t0 = Instant::now();
        to_feeding(&mut sequencer, t0);
        sequencer.hardware().feed_pending.set(false);
        assert_eq!(sequencer.tick(t0), Duration::ZERO);
        sequencer.tick(t0);
        assert_eq!(program.current_index(), 0);
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Feed), 2);
    }

    #[test]
    fn pause_while_positioning_resumes_same_shot() {
        let (mut sequencer, program) = sequencer(two_shots());
        let t0 = Instant::now();
        sequencer.tick(t0);

        program.set_feeding(false);
        assert_eq!(sequencer.tick(t0), Duration::from_millis(100));
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert_eq!(sequencer.hardware().last_flywheel(), Some(Call::FlywheelStop));
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Feed), 0);

        // Still paused, even with axes ready
        sequencer.hardware().set_ready(true);
        sequencer.tick(t0);
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Feed), 0);

        program.set_feeding(true);
        sequencer.tick(t0);
        assert!(matches!(sequencer.state(), SequencerState::Feeding { index: 0, .. }));
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Pan(7)), 2);
        assert_eq!(sequencer.hardware().last_flywheel(), Some(Call::Flywheel(5, 7)));
        assert_eq!(program.current_index(), 0);
    }

    #[test]
    fn feeding_is_not_abortable() {
        let (mut sequencer, program) = sequencer(two_shots());
        let t0 = Instant::now();
        to_feeding(&mut sequencer, t0);

        program.set_feeding(false);
        assert_eq!(sequencer.tick(t0), Duration::from_millis(10));
        assert!(matches!(sequencer.state(), SequencerState::Feeding { .. }));
        assert_eq!(sequencer.hardware().last_flywheel(), Some(Call::Flywheel(5, 7)));

        // Shot completes, then the pause applies
        sequencer.hardware().feed_pending.set(false);
        sequencer.tick(t0);
        assert_eq!(program.last_shot(), Some(0));
        sequencer.tick(t0);
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert_eq!(sequencer.hardware().last_flywheel(), Some(Call::FlywheelStop));
    }

    #[test]
    fn aborted_delay_advances() {
        let (mut sequencer, program) = sequencer(two_shots());
        let t0 = Instant::now();
        to_feeding(&mut sequencer, t0);
        sequencer.hardware().feed_pending.set(false);
        sequencer.tick(t0);
        assert!(matches!(sequencer.state(), SequencerState::Waiting { .. }));

        program.set_feeding(false);
        sequencer.tick(t0 + Duration::from_millis(200));
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert_eq!(program.current_index(), 1);

        program.set_feeding(true);
        sequencer.tick(t0 + Duration::from_millis(300));
        assert!(matches!(sequencer.state(), SequencerState::Feeding { index: 1, .. }));
    }

    #[test]
    fn jam_halts() {
        let (mut sequencer, program) = sequencer(two_shots());
        let t0 = Instant::now();
        to_feeding(&mut sequencer, t0);

        sequencer.hardware().jammed.set(true);
        assert_eq!(sequencer.tick(t0), Duration::from_millis(100));
        assert_eq!(sequencer.state(), SequencerState::Halted);
        assert_eq!(sequencer.hardware().last_flywheel(), Some(Call::FlywheelStop));
        assert_eq!(program.last_shot(), None);

        program.set_feeding(false);
        sequencer.tick(t0);
        program.set_feeding(true);
        sequencer.tick(t0 + Duration::from_secs(5));
        assert_eq!(sequencer.state(), SequencerState::Halted);
        assert_eq!(program.current_index(), 0);
        assert_eq!(sequencer.hardware().count(|c| *c == Call::Feed), 1);
    }

    #[test]
    fn empty_program_pauses() {
        let (mut sequencer, _program) = sequencer(vec![]);
        assert_eq!(sequencer.tick(Instant::now()), Duration::from_millis(100));
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert_eq!(*sequencer.hardware().calls.borrow(), vec![Call::FlywheelStop]);
    }
}

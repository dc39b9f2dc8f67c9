mod bringup;
mod config;
mod periodicity;

use std::fmt::Display;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use board_frankenshot::FrankenshotBoard;
use launcher::{Axis, Feeder, FlywheelMixer, Launcher, Program, ProgramStore, PulseStepper};
use config::{BootMode, LauncherConfig, DEFAULT_PROGRAM};
use periodicity::Periodicity;

#[cfg(target_os = "espidf")]
use board_frankenshot::EspFrankenshotBoard as BoardImpl;
#[cfg(not(target_os = "espidf"))]
use board_frankenshot::SimFrankenshotBoard as BoardImpl;

const STATUS_PERIOD: Duration = Duration::from_secs(2);


fn build_launcher<B: FrankenshotBoard>(board: &mut B, config: &LauncherConfig) -> Launcher {
    let pins = board.pan_stepper().unwrap();
    let pan = Axis::new(
        config.pan.clone(),
        PulseStepper::new(pins.step, pins.dir, pins.enable, board.delay(), config.pan.step_delay_us),
        board.pan_switch().unwrap(),
    );

    let pins = board.elevation_stepper().unwrap();
    let elevation = Axis::new(
        config.elevation.clone(),
        PulseStepper::new(pins.step, pins.dir, pins.enable, board.delay(), config.elevation.step_delay_us),
        board.elevation_switch().unwrap(),
    );

    let feeder = Feeder::new(board.feed_motor().unwrap(), board.feed_switch().unwrap(), config.feed.clone());

    let flywheels = board.flywheel_motors().unwrap();
    let mixer = FlywheelMixer::new(flywheels.top, flywheels.bottom, config.flywheel.clone());

    Launcher::new(pan, elevation, feeder, mixer, config.tasks.clone())
}

/// Stop there, the machine needs a human
fn halt(reason: impl Display) -> ! {
    log::error!("Startup stopped: {reason}");
    loop {
        thread::sleep(Duration::from_secs(1));
    }
}


fn main() {
    let mut board = BoardImpl::init();
    let config = LauncherConfig::default();

    let mode = BootMode::from_env();
    log::info!("Boot mode: {:?}", mode);
    match mode {
        BootMode::FeedMotorCycle => bringup::feed_motor_cycle(&mut board, &config),
        BootMode::SwitchMonitor => bringup::switch_monitor(&mut board),
        BootMode::Run | BootMode::SmokeTest => {}
    }

    let mut launcher = build_launcher(&mut board, &config);
    launcher.init_all_actuators();

    log::info!("Homing");
    if let Err(err) = launcher.home_pan() {
        halt(err);
    }
    thread::sleep(Duration::from_millis(10));
    if let Err(err) = launcher.home_elevation() {
        halt(err);
    }
    thread::sleep(Duration::from_millis(10));

    if let Err(err) = launcher.start_tasks() {
        log::error!("Failed to start tasks: {err}");
        BoardImpl::restart();
        return;
    }
    let handle = launcher.handle();

    if mode == BootMode::SmokeTest {
        bringup::smoke_test(&handle);
        loop {
            thread::sleep(Duration::from_secs(1));
        }
    }

    let program = Arc::new(ProgramStore::new(Program::new(DEFAULT_PROGRAM.to_vec()), config::feeding_at_boot()));
    log::info!("Start sequencer, {} shots, feeding {}", program.len(), program.feeding_enabled());
    if let Err(err) = launcher.spawn_sequencer(program.clone(), config.sequencer.clone()) {
        log::error!("Failed to start sequencer: {err}");
        BoardImpl::restart();
        return;
    }

    let mut status_period = Periodicity::new(STATUS_PERIOD);
    loop {
        let now = Instant::now();
        if status_period.update(now) {
            let (pan, elevation) = handle.position();
            log::info!(
                "Status: pan {:?} at {}, elevation {:?} at {}, feed {:?}, shot {} (last {:?})",
                handle.pan_state(), pan,
                handle.elevation_state(), elevation,
                handle.feed_state(),
                program.current_index(), program.last_shot(),
            );
        }
        thread::sleep(status_period.remaining(Instant::now()));
    }
}

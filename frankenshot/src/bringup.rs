//! Bench routines used while assembling the machine

use std::thread;
use std::time::Duration;
use board_frankenshot::FrankenshotBoard;
use launcher::LauncherHandle;
use launcher::debounce::DebouncedSwitch;
use launcher::motor::MotorDriver;
use crate::config::LauncherConfig;

const SWITCH_POLL_PERIOD: Duration = Duration::from_millis(10);


/// Run the feed motor 10 s, stop it 4 s, repeat
pub fn feed_motor_cycle<B: FrankenshotBoard>(board: &mut B, config: &LauncherConfig) -> ! {
    let mut motor = MotorDriver::new("feed", board.feed_motor().unwrap());
    loop {
        log::info!("Feed motor ON");
        motor.start(config.feed.duty);
        thread::sleep(Duration::from_secs(10));
        log::info!("Feed motor OFF");
        motor.stop();
        thread::sleep(Duration::from_secs(4));
    }
}

/// Log each debounced switch change
pub fn switch_monitor<B: FrankenshotBoard>(board: &mut B) -> ! {
    let mut switches = [
        ("feed", DebouncedSwitch::new(board.feed_switch().unwrap())),
        ("pan", DebouncedSwitch::new(board.pan_switch().unwrap())),
        ("elevation", DebouncedSwitch::new(board.elevation_switch().unwrap())),
    ];
    let mut states = [false; 3];

    log::info!("Monitoring switches");
    loop {
        for ((name, switch), state) in switches.iter_mut().zip(states.iter_mut()) {
            let pressed = switch.pressed();
            if pressed != *state {
                log::info!("Switch {} {}", name, if pressed { "PRESSED" } else { "released" });
                *state = pressed;
            }
        }
        thread::sleep(SWITCH_POLL_PERIOD);
    }
}

/// Exercise every actuator once, tasks must be running
pub fn smoke_test(launcher: &LauncherHandle) {
    log::info!("Smoke test");
    thread::sleep(Duration::from_secs(1));
    launcher.move_pan_to_relative(7).ok();
    thread::sleep(Duration::from_millis(10));
    launcher.set_flywheel(5, 5).ok();
    thread::sleep(Duration::from_secs(10));
    launcher.move_elevation_to_relative(5).ok();
    thread::sleep(Duration::from_secs(5));
    launcher.request_feed();
    thread::sleep(Duration::from_secs(10));
    launcher.stop_flywheel();

    let (pan, elevation) = launcher.position();
    log::info!("Smoke test done: pan at {}, elevation at {}, feed {:?}", pan, elevation, launcher.feed_state());
}

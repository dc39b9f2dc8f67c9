use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use crate::lock;


/// One shot of a program
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShotConfig {
    /// Flywheel speed, 1 to 10
    pub speed: u8,
    /// Flywheel spin, 0 to 10, 5 is neutral
    pub spin: u8,
    /// Pan position, 0 to 10
    pub pan: u8,
    /// Elevation position, 0 to 10
    pub elevation: u8,
    /// Delay after the ball is fed, in seconds
    pub delay_secs: u8,
}

impl ShotConfig {
    pub const fn new(speed: u8, spin: u8, pan: u8, elevation: u8, delay_secs: u8) -> Self {
        Self { speed, spin, pan, elevation, delay_secs }
    }
}


/// Cyclic list of shots with a cursor
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub shots: Vec<ShotConfig>,
    pub current: usize,
}

impl Program {
    pub fn new(shots: Vec<ShotConfig>) -> Self {
        Self { shots, current: 0 }
    }
}


const NO_SHOT: usize = usize::MAX;

/// Program and feeding flag, shared with the outside world
///
/// The sequencer reads the program and the flag, and writes back the cursor
/// and the index of the last executed shot.
#[derive(Debug)]
pub struct ProgramStore {
    program: Mutex<Program>,
    feeding: AtomicBool,
    last_shot: AtomicUsize,
}

impl ProgramStore {
    pub fn new(program: Program, feeding: bool) -> Self {
        Self {
            program: Mutex::new(program),
            feeding: AtomicBool::new(feeding),
            last_shot: AtomicUsize::new(NO_SHOT),
        }
    }

    pub fn feeding_enabled(&self) -> bool {
        self.feeding.load(Ordering::Acquire)
    }

    pub fn set_feeding(&self, enabled: bool) {
        if self.feeding.swap(enabled, Ordering::AcqRel) != enabled {
            log::info!("program: feeding {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    /// Load a new program
    ///
    /// An out of range cursor restarts from the first shot.
    pub fn replace_program(&self, program: Program) {
        let mut current = lock(&self.program);
        log::info!("program: {} shots loaded", program.shots.len());
        *current = program;
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.program).shots.is_empty()
    }

    pub fn len(&self) -> usize {
        lock(&self.program).shots.len()
    }

    /// Shot under the cursor, with its index
    pub fn active_shot(&self) -> Option<(usize, ShotConfig)> {
        let mut program = lock(&self.program);
        if program.shots.is_empty() {
            return None;
        }
        if program.current >= program.shots.len() {
            program.current = 0;
        }
        Some((program.current, program.shots[program.current]))
    }

    pub fn current_index(&self) -> usize {
        lock(&self.program).current
    }

    /// Move the cursor after the given shot, wrapping around
    pub fn advance_from(&self, index: usize) -> usize {
        let mut program = lock(&self.program);
        let len = program.shots.len();
        program.current = if len == 0 { 0 } else { (index + 1) % len };
        program.current
    }

    pub fn publish_shot(&self, index: usize) {
        self.last_shot.store(index, Ordering::Release);
    }

    /// Index of the last executed shot, if any
    pub fn last_shot(&self) -> Option<usize> {
        match self.last_shot.load(Ordering::Acquire) {
            NO_SHOT => None,
            index => Some(index),
        }
    }
}

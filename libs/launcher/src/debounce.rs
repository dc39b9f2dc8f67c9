use embedded_hal::digital::InputPin;

/// Number of identical consecutive samples required to accept a new level
pub const DEBOUNCE_COUNT: u8 = 3;


/// Run-length filter for a sampled boolean
#[derive(Clone, Debug, Default)]
pub struct Debouncer {
    last_raw: bool,
    count: u8,
    stable: bool,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            last_raw: false,
            count: 0,
            stable: false,
        }
    }

    /// Feed a raw sample, return the stable value
    pub fn update(&mut self, raw: bool) -> bool {
        if raw == self.last_raw {
            if self.count < DEBOUNCE_COUNT {
                self.count += 1;
            }
        } else {
            self.count = 0;
        }

        if self.count >= DEBOUNCE_COUNT {
            self.stable = raw;
        }

        self.last_raw = raw;
        self.stable
    }

    pub fn stable(&self) -> bool {
        self.stable
    }
}


/// Normally-closed switch read through a [Debouncer]
///
/// The input reads high when the switch is triggered or its wire is cut.
/// A read error counts as pressed, which is the safe value for motor stops.
pub struct DebouncedSwitch<P> {
    pin: P,
    debouncer: Debouncer,
}

impl<P: InputPin> DebouncedSwitch<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            debouncer: Debouncer::new(),
        }
    }

    /// Sample the pin, return the debounced state
    pub fn pressed(&mut self) -> bool {
        let raw = self.pin.is_high().unwrap_or(true);
        self.debouncer.update(raw)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};

    #[test]
    fn stable_changes_after_run_length() {
        let mut debouncer = Debouncer::new();

        // First differing sample resets the run, then three repeats are needed
        assert!(!debouncer.update(true));
        assert!(!debouncer.update(true));
        assert!(!debouncer.update(true));
        assert!(debouncer.update(true));
        assert!(debouncer.stable());
    }

    #[test]
    fn bounce_is_rejected() {
        let mut debouncer = Debouncer::new();
        let samples = [true, false, true, true, false, true, true, true, false];
        for raw in samples {
            assert!(!debouncer.update(raw));
        }
    }

    #[test]
    fn release_needs_same_run_length() {
        let mut debouncer = Debouncer::new();
        for _ in 0..4 {
            debouncer.update(true);
        }
        assert!(debouncer.stable());

        assert!(debouncer.update(false));
        assert!(debouncer.update(false));
        assert!(debouncer.update(false));
        assert!(!debouncer.update(false));
    }

    #[test]
    fn output_only_follows_full_runs() {
        // Pseudo-random samples, stable must only change after a full run
        let mut debouncer = Debouncer::new();
        let mut seed: u32 = 0x1234_5678;
        let mut run: u32 = 0;
        let mut last = false;
        let mut previous_stable = false;
        for _ in 0..2000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let raw = (seed >> 16) & 0x3 == 0;
            run = if raw == last { run + 1 } else { 0 };
            last = raw;

            let stable = debouncer.update(raw);
            if stable != previous_stable {
                assert_eq!(stable, raw);
                assert!(run >= DEBOUNCE_COUNT as u32);
            }
            previous_stable = stable;
        }
    }

    #[test]
    fn switch_reads_pin_each_poll() {
        let expectations = [
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ];
        let mut pin = PinMock::new(&expectations);
        let mut switch = DebouncedSwitch::new(pin.clone());

        assert!(!switch.pressed());
        assert!(!switch.pressed());
        assert!(!switch.pressed());
        assert!(switch.pressed());
        // A single low sample is not enough to release
        assert!(switch.pressed());

        pin.done();
    }
}

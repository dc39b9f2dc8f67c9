use std::time::{Duration, Instant};


/// Fire at a fixed period from a polling loop
pub struct Periodicity {
    next: Instant,
    period: Duration,
}

impl Periodicity {
    pub fn new(period: Duration) -> Self {
        Self {
            next: Instant::now() + period,
            period,
        }
    }

    /// Return true if the period elapsed, then rearm
    pub fn update(&mut self, now: Instant) -> bool {
        if now >= self.next {
            self.next = now + self.period;
            true
        } else {
            false
        }
    }

    /// Time left before the next period
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
}

// Idle backoff between sweeps that harvested nothing

use std::time::Duration;

/// Bounded exponential backoff
///
/// Doubles on every idle sweep up to `max`, drops back to `min` after a
/// productive sweep.
#[derive(Debug, Clone)]
pub struct IdleBackoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl IdleBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            current: min,
        }
    }

    /// Interval to wait now; advances the backoff for the next idle sweep
    pub fn next_interval(&mut self) -> Duration {
        let interval = self.current;
        self.current = (self.current * 2).min(self.max);
        interval
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of monotonic timestamps for the timer.
///
/// Readings are durations since an arbitrary origin fixed at clock
/// creation. Elapsed time is always a delta of two readings, never a
/// wall-clock subtraction.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Production clock backed by `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same underlying reading, so a test can keep a handle
/// while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    reading: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.reading.set(self.reading.get() + by);
    }

    /// Sets the reading outright. Tests use this to simulate a
    /// non-monotonic source; consumers are expected to clamp.
    pub fn set(&self, to: Duration) {
        self.reading.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.reading.get()
    }
}

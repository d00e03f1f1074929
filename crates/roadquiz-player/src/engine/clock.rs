//! Time sources for the frame loop.

use std::time::Instant;

/// Monotonic milliseconds since the clock was created
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall clock
#[cfg_attr(not(feature = "window"), allow(dead_code))] // Drives the viewer loop
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    #[cfg_attr(not(feature = "window"), allow(dead_code))]
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to (headless sessions and tests)
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now_ms: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

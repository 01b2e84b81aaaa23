// Time source for the capture loop
//
// Timestamps and the inter-sample sleep both go through `Clock`, so the whole
// session can be driven by `ManualClock` in tests without real waiting.

use std::thread;
use std::time::{Duration, Instant};

/// Seconds-since-start clock plus the blocking sleep used between reads
pub trait Clock {
    /// Seconds elapsed since the clock was created
    fn now(&self) -> f64;

    /// Block for roughly `duration`; no drift compensation
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Deterministic clock: time only moves when `sleep` or `advance` is called
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: f64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration.as_secs_f64());
    }
}

//! Stall detection for stream receivers.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks the time of the last successful read.
#[derive(Clone, Copy, Debug)]
pub struct Watchdog {
    timeout: Duration,
    last_read: Instant,
}

impl Watchdog {
    /// Start a watchdog that fires `timeout` after the last read.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_read: Instant::now(),
        }
    }

    /// Record a successful read.
    pub fn feed(&mut self) { self.last_read = Instant::now(); }

    /// Whether more than the window has passed since the last read.
    #[must_use]
    pub fn expired(&self) -> bool { self.last_read.elapsed() > self.timeout }

    /// Configured window.
    #[must_use]
    pub const fn timeout(&self) -> Duration { self.timeout }
}

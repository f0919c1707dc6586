use chrono::Utc;
use tempora_core::SimInstant;
use tempora_ports::WallClock;
use tokio::time::Instant;

/// Real system clock for production use
///
/// Monotonic time comes from tokio, so a runtime with paused time (tests)
/// observes the paused clock.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn timestamp(&self) -> SimInstant {
        Utc::now()
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}

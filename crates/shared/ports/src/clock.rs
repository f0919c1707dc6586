use tempora_core::SimInstant;
use tokio::time::Instant;

/// Port for wall-clock time
///
/// This allows the engine to use different time sources:
/// - Real monotonic time for production
/// - Tokio's pausable clock for deterministic pacing tests
pub trait WallClock: Send + Sync {
    /// Monotonic instant used to compute and await pacing deadlines
    fn now(&self) -> Instant;

    /// Calendar time, used to pin a timer epoch that was left open
    fn timestamp(&self) -> SimInstant;

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "WallClock"
    }
}

use tempora_core::{ClockId, ClockStatus, SimDuration, TriggerId};
use thiserror::Error;

/// Domain-level errors for clock and trigger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Cannot parse pattern '{pattern}': {reason}")]
    PatternParse { pattern: String, reason: String },

    #[error("Unknown clock: {0}")]
    UnknownClock(ClockId),

    #[error("Cannot remove root clock: {0}")]
    CannotRemoveRoot(ClockId),

    #[error("Clock {clock_id} cannot travel back from {current} to {requested}")]
    InvalidTimeTravel {
        clock_id: ClockId,
        current: SimDuration,
        requested: SimDuration,
    },

    #[error("Delivery to subscriber {subscriber} failed: {reason}")]
    SubscriberDelivery { subscriber: String, reason: String },

    #[error("Unknown trigger: {0}")]
    UnknownTrigger(TriggerId),

    #[error("Clock {clock_id} is {status}, expected RUNNING")]
    NotRunning {
        clock_id: ClockId,
        status: ClockStatus,
    },

    #[error("Engine for clock {0} has stopped")]
    EngineStopped(ClockId),
}

pub type TimeResult<T> = std::result::Result<T, TimeError>;

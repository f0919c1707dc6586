use serde::{Deserialize, Serialize};
use std::fmt;

use super::ClockId;
use crate::values::{Rate, SimDuration};

/// Clock lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClockStatus {
    /// Created or paused; time does not advance
    #[default]
    Waiting,
    /// Time advances and due triggers fire
    Running,
    /// Reached its `until` bound or was completed on request
    Completed,
    /// Stopped by an internal invariant violation
    Failed,
}

impl ClockStatus {
    /// Returns true once no further transitions are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClockStatus::Completed | ClockStatus::Failed)
    }
}

impl fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClockStatus::Waiting => "WAITING",
            ClockStatus::Running => "RUNNING",
            ClockStatus::Completed => "COMPLETED",
            ClockStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Configuration and observable state of one virtual clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockConfig {
    pub id: ClockId,
    /// Clock this one was forked from (lookup only)
    #[serde(default)]
    pub fork_parent_id: Option<ClockId>,
    /// Parent time at which the fork occurred
    #[serde(default)]
    pub fork_offset: Option<SimDuration>,
    #[serde(default)]
    pub status: ClockStatus,
    /// Wall-clock pacing; `None` runs unconstrained
    #[serde(default)]
    pub pace: Option<Rate>,
    #[serde(default)]
    pub time: SimDuration,
    /// Auto-complete bound; `None` defers to the timer duration
    #[serde(default)]
    pub until: Option<SimDuration>,
    /// Max wall-clock wait on a subscriber callback
    #[serde(default)]
    pub slave_timeout: Option<std::time::Duration>,
}

impl ClockConfig {
    /// Create a waiting clock at time zero with no pacing
    pub fn new(id: impl Into<ClockId>) -> Self {
        Self {
            id: id.into(),
            fork_parent_id: None,
            fork_offset: None,
            status: ClockStatus::Waiting,
            pace: None,
            time: SimDuration::ZERO,
            until: None,
            slave_timeout: None,
        }
    }

    pub fn with_status(mut self, status: ClockStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_pace(mut self, pace: impl Into<Rate>) -> Self {
        self.pace = Some(pace.into());
        self
    }

    pub fn with_time(mut self, time: SimDuration) -> Self {
        self.time = time;
        self
    }

    pub fn with_until(mut self, until: SimDuration) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_slave_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.slave_timeout = Some(timeout);
        self
    }

    /// Mark this clock as a fork of `parent` taken at `offset`
    pub fn forked_from(mut self, parent: impl Into<ClockId>, offset: SimDuration) -> Self {
        self.fork_parent_id = Some(parent.into());
        self.fork_offset = Some(offset);
        self.time = offset;
        self
    }

    /// Properties of `desired` that differ from `self`
    ///
    /// Status is always listed last so that pace, bounds and time are in
    /// place before a status transition is evaluated.
    pub fn diff(&self, desired: &ClockConfig) -> Vec<ClockChange> {
        let mut changes = Vec::new();
        if self.pace != desired.pace {
            changes.push(ClockChange::Pace(desired.pace));
        }
        if self.until != desired.until {
            changes.push(ClockChange::Until(desired.until));
        }
        if self.slave_timeout != desired.slave_timeout {
            changes.push(ClockChange::SlaveTimeout(desired.slave_timeout));
        }
        if self.time != desired.time {
            changes.push(ClockChange::Time(desired.time));
        }
        if self.status != desired.status {
            changes.push(ClockChange::Status(desired.status));
        }
        changes
    }
}

/// A single property change applied to a live clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "property", content = "value")]
pub enum ClockChange {
    Pace(Option<Rate>),
    Until(Option<SimDuration>),
    SlaveTimeout(Option<std::time::Duration>),
    Time(SimDuration),
    Status(ClockStatus),
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ClockConfig, ClockId, ClockStatus, TriggerId};
use crate::values::{Rate, SimDuration, SimInstant};

/// Snapshot of a clock taken after an observable change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockEvent {
    pub id: Uuid,
    pub clock_id: ClockId,
    pub status: ClockStatus,
    pub drag: Option<Rate>,
    pub time: SimDuration,
    pub until: Option<SimDuration>,
}

impl ClockEvent {
    pub fn snapshot(config: &ClockConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            clock_id: config.id.clone(),
            status: config.status,
            drag: config.pace,
            time: config.time,
            until: config.until,
        }
    }
}

/// Notification that a trigger fired
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub trigger_id: TriggerId,
    pub clock_id: ClockId,
    /// Clock time at which the trigger fired
    pub time: SimDuration,
    /// Same moment expressed as an absolute simulated instant
    pub instant: SimInstant,
    /// No further events follow on this registration
    pub is_last: bool,
}

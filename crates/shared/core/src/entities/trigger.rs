use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ClockId, TriggerId};

/// A recurrence pattern registered against a clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    pub id: TriggerId,
    /// Clock whose time line governs firing; `None` is the root clock
    #[serde(default)]
    pub clock_id: Option<ClockId>,
    /// Cron rule, iCal recurrence rule or ISO-8601 instant
    pub pattern: String,
}

impl TriggerConfig {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            clock_id: None,
            pattern: pattern.into(),
        }
    }

    pub fn on_clock(mut self, clock_id: impl Into<ClockId>) -> Self {
        self.clock_id = Some(clock_id.into());
        self
    }

    pub fn with_id(mut self, id: TriggerId) -> Self {
        self.id = id;
        self
    }
}

//! Request/response envelope for time manager operations

use serde::{Deserialize, Serialize};
use tempora_core::{
    ClockConfig, ClockId, SubscriptionId, TimerConfig, TriggerConfig, TriggerId,
};
use tempora_manager::TimerStatus;

use crate::operation::Operation;

/// One call on the time manager
///
/// Wire shape: `{"operation": "removeClock", "params": "clockA"}`.
/// Streaming operations carry the callback address their events go to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "params", rename_all = "camelCase")]
pub enum Request {
    SetTimerConfig(TimerConfig),
    GetTimerConfig,
    GetTimerStatus,
    Destroy,
    /// `None` asks for the root clock
    GetClock(Option<ClockId>),
    UpdateClock(ClockConfig),
    #[serde(rename_all = "camelCase")]
    ForkClock {
        parent_id: ClockId,
        child_id: ClockId,
    },
    RemoveClock(ClockId),
    #[serde(rename_all = "camelCase")]
    ObserveClock {
        clock_id: ClockId,
        callback: String,
    },
    RegisterTrigger {
        trigger: TriggerConfig,
        callback: String,
    },
    UpdateTrigger {
        trigger: TriggerConfig,
        callback: String,
    },
    RemoveTrigger(TriggerId),
    Unsubscribe(SubscriptionId),
}

impl Request {
    pub fn operation(&self) -> Operation {
        match self {
            Request::SetTimerConfig(_) => Operation::SetTimerConfig,
            Request::GetTimerConfig => Operation::GetTimerConfig,
            Request::GetTimerStatus => Operation::GetTimerStatus,
            Request::Destroy => Operation::Destroy,
            Request::GetClock(_) => Operation::GetClock,
            Request::UpdateClock(_) => Operation::UpdateClock,
            Request::ForkClock { .. } => Operation::ForkClock,
            Request::RemoveClock(_) => Operation::RemoveClock,
            Request::ObserveClock { .. } => Operation::ObserveClock,
            Request::RegisterTrigger { .. } => Operation::RegisterTrigger,
            Request::UpdateTrigger { .. } => Operation::UpdateTrigger,
            Request::RemoveTrigger(_) => Operation::RemoveTrigger,
            Request::Unsubscribe(_) => Operation::Unsubscribe,
        }
    }
}

/// Successful answer to a [`Request`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Response {
    Done,
    TimerConfig(TimerConfig),
    TimerStatus(TimerStatus),
    Clock(ClockConfig),
    /// Events will arrive on the callback under this id
    Subscribed(SubscriptionId),
}

impl Response {
    pub fn subscription(&self) -> Option<SubscriptionId> {
        match self {
            Response::Subscribed(id) => Some(*id),
            _ => None,
        }
    }
}

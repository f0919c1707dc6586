//! Operations a transport may call
//!
//! Every manager operation has a wire name. Only the names in the exported
//! allow-list are reachable remotely; the rest stay in-process.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    SetTimerConfig,
    GetTimerConfig,
    GetTimerStatus,
    Destroy,
    GetClock,
    UpdateClock,
    ForkClock,
    RemoveClock,
    ObserveClock,
    RegisterTrigger,
    UpdateTrigger,
    RemoveTrigger,
    Unsubscribe,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::SetTimerConfig,
        Operation::GetTimerConfig,
        Operation::GetTimerStatus,
        Operation::Destroy,
        Operation::GetClock,
        Operation::UpdateClock,
        Operation::ForkClock,
        Operation::RemoveClock,
        Operation::ObserveClock,
        Operation::RegisterTrigger,
        Operation::UpdateTrigger,
        Operation::RemoveTrigger,
        Operation::Unsubscribe,
    ];

    /// Operations published to remote callers by default
    pub const EXPORTED: [Operation; 11] = [
        Operation::SetTimerConfig,
        Operation::GetTimerConfig,
        Operation::GetTimerStatus,
        Operation::Destroy,
        Operation::UpdateClock,
        Operation::RemoveClock,
        Operation::ObserveClock,
        Operation::RegisterTrigger,
        Operation::UpdateTrigger,
        Operation::RemoveTrigger,
        Operation::Unsubscribe,
    ];

    /// Wire name: `setTimerConfig`, `observeClock`, ...
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SetTimerConfig => "setTimerConfig",
            Operation::GetTimerConfig => "getTimerConfig",
            Operation::GetTimerStatus => "getTimerStatus",
            Operation::Destroy => "destroy",
            Operation::GetClock => "getClock",
            Operation::UpdateClock => "updateClock",
            Operation::ForkClock => "forkClock",
            Operation::RemoveClock => "removeClock",
            Operation::ObserveClock => "observeClock",
            Operation::RegisterTrigger => "registerTrigger",
            Operation::UpdateTrigger => "updateTrigger",
            Operation::RemoveTrigger => "removeTrigger",
            Operation::Unsubscribe => "unsubscribe",
        }
    }

    pub fn from_name(name: &str) -> Option<Operation> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn is_exported(&self) -> bool {
        Self::EXPORTED.contains(self)
    }

    /// Operations that answer with a callback subscription
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            Operation::ObserveClock | Operation::RegisterTrigger | Operation::UpdateTrigger
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of the root clock when a timer does not specify one
pub const DEFAULT_ROOT_CLOCK: &str = "rootClock";

/// Identifier of a clock, unique within one timer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClockId(String);

impl ClockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self::new(DEFAULT_ROOT_CLOCK)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClockId {
    fn default() -> Self {
        Self::root()
    }
}

impl From<&str> for ClockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a timer configuration
pub type TimerId = String;

/// Unique identifier for a trigger registration
pub type TriggerId = Uuid;

/// Opaque handle for a callback subscription
///
/// Generated per registration from a time-ordered UUID, so ids compare in
/// creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tempora_core::{SimDuration, SimInstant};
use tempora_ports::WallClock;

/// Default buffered commands per clock
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Scheduling strategy behind a clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineKind {
    /// Navigable time index; ties fire in trigger-id order
    #[default]
    Reactive,
    /// Future-event list; ties fire in registration order
    DiscreteEvent,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Reactive => f.write_str("reactive"),
            EngineKind::DiscreteEvent => f.write_str("discrete-event"),
        }
    }
}

/// Tunables shared by every engine of a manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub kind: EngineKind,
    /// Buffered commands per clock before callers wait
    pub channel_capacity: usize,
    /// Fired events kept per trigger for status reports
    pub recent_events: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            recent_events: 8,
        }
    }
}

/// Everything an engine needs besides its clock config
#[derive(Clone)]
pub struct EngineContext {
    /// Absolute instant of clock time zero
    pub epoch: SimInstant,
    /// Completion bound used when the clock has no `until` of its own
    pub default_until: Option<SimDuration>,
    pub wall: Arc<dyn WallClock>,
    pub settings: EngineSettings,
}

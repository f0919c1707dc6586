use serde::Serialize;
use tempora_core::{ClockConfig, ClockId, SimInstant, TimerConfig};
use tempora_engine::{EngineKind, TriggerStatus};

/// Read-only snapshot of a whole timer run, for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub timer: TimerConfig,
    /// Absolute instant of clock time zero
    pub epoch: SimInstant,
    /// One report per live clock, ordered by clock id
    pub clocks: Vec<ClockStatusReport>,
}

impl TimerStatus {
    pub fn clock(&self, id: &ClockId) -> Option<&ClockStatusReport> {
        self.clocks.iter().find(|report| report.config.id == *id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockStatusReport {
    pub config: ClockConfig,
    pub engine: EngineKind,
    /// Registrations still pending on this clock
    pub triggers: Vec<TriggerStatus>,
}

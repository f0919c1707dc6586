use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ClockConfig, ClockId, TimerId};
use crate::values::{SimDuration, SimInstant};

/// Top-level configuration of one timer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub id: TimerId,
    #[serde(default)]
    pub root_clock_id: ClockId,
    /// Granularity of discrete time; `None` is continuous
    #[serde(default)]
    pub resolution: Option<SimDuration>,
    /// Simulated epoch; `None` starts at the moment the config is applied
    #[serde(default)]
    pub offset: Option<SimInstant>,
    /// Total simulated length of the run
    #[serde(default)]
    pub duration: Option<SimDuration>,
    /// Clocks seeded when the config is applied
    #[serde(default)]
    pub clocks: BTreeMap<ClockId, ClockConfig>,
}

impl TimerConfig {
    pub fn new(id: impl Into<TimerId>) -> Self {
        Self {
            id: id.into(),
            root_clock_id: ClockId::root(),
            resolution: None,
            offset: None,
            duration: None,
            clocks: BTreeMap::new(),
        }
    }

    pub fn with_root_clock(mut self, root: impl Into<ClockId>) -> Self {
        self.root_clock_id = root.into();
        self
    }

    pub fn with_resolution(mut self, resolution: SimDuration) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_offset(mut self, offset: SimInstant) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_duration(mut self, duration: SimDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_clock(mut self, clock: ClockConfig) -> Self {
        self.clocks.insert(clock.id.clone(), clock);
        self
    }

    /// Config of the root clock, defaulted if the timer does not list it
    pub fn root_clock(&self) -> ClockConfig {
        self.clocks
            .get(&self.root_clock_id)
            .cloned()
            .unwrap_or_else(|| ClockConfig::new(self.root_clock_id.clone()))
    }

    /// Snap a time to the configured resolution (rounding down)
    pub fn quantize(&self, time: SimDuration) -> SimDuration {
        match self.resolution {
            Some(step) if step.as_nanos() > 0 => {
                let nanos = time.as_nanos();
                SimDuration::from_nanos(nanos - nanos.rem_euclid(step.as_nanos()))
            }
            _ => time,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new("timer")
    }
}

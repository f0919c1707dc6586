use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tempora_core::TimerConfig;
use tempora_engine::EngineSettings;
use tempora_pattern::zone_from_offset;

/// Settings a time manager is built from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSettings {
    /// Timer config applied when the manager starts
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    /// Zone for cron evaluation, as seconds east of UTC
    #[serde(default)]
    pub zone_offset_seconds: i32,
}

impl ManagerSettings {
    pub fn with_timer(mut self, timer: TimerConfig) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_engine(mut self, engine: EngineSettings) -> Self {
        self.engine = engine;
        self
    }

    pub fn zone(&self) -> FixedOffset {
        zone_from_offset(self.zone_offset_seconds)
    }
}

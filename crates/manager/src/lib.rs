//! Tempora Time Manager
//!
//! The registry that owns every clock engine of one timer run. It resolves
//! clock ids (creating clocks lazily where that is allowed), turns recurrence
//! patterns into clock-relative fire times, and keeps the trigger index used
//! for updates and removal.
//!
//! ```text
//! caller ──► TimeManager ──► DashMap<ClockId, ClockEntry> ──► ClockEngine (driver task)
//!                 │
//!                 └──► DashMap<TriggerId, TriggerConfig>
//! ```

mod manager;
pub mod settings;
mod status;

pub use manager::TimeManager;
pub use settings::{
    ConfigError, ManagerSettings, load_default_settings, load_settings, load_settings_from_str,
};
pub use status::{ClockStatusReport, TimerStatus};

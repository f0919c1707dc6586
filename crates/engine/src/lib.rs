//! Tempora Clock Engines
//!
//! Each virtual clock is driven by its own task. Two scheduling strategies
//! share the [`ClockEngine`] contract:
//!
//! - reactive: pending fires in a navigable time index
//! - discrete-event: pending fires in a future-event list ([`DesScheduler`])

// Event streams
pub mod bus;

// Scheduling
pub mod des;
pub mod schedule;

// Engine
mod config;
mod driver;
mod engine;
mod registration;

pub use bus::{EventBus, Notification, Subscription};
pub use config::{EngineContext, EngineKind, EngineSettings};
pub use des::{DesScheduler, EventId};
pub use engine::{ClockEngine, ClockHandle, spawn_engine};
pub use registration::{FireTimes, TriggerStatus};
pub use schedule::{DiscreteEventSchedule, ReactiveSchedule, TriggerSchedule};

//! Tempora Core Domain
//!
//! Pure value types for the virtual-time coordination service.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Configuration
    ClockChange,
    ClockConfig,
    // Events
    ClockEvent,
    // Identifiers
    ClockId,
    ClockStatus,
    DEFAULT_ROOT_CLOCK,
    SubscriptionId,
    TimerConfig,
    TimerId,
    TriggerConfig,
    TriggerEvent,
    TriggerId,
};
pub use values::{Rate, SimDuration, SimInstant};

mod clock;
mod events;
mod ids;
mod timer;
mod trigger;

pub use clock::{ClockChange, ClockConfig, ClockStatus};
pub use events::{ClockEvent, TriggerEvent};
pub use ids::{ClockId, DEFAULT_ROOT_CLOCK, SubscriptionId, TimerId, TriggerId};
pub use timer::TimerConfig;
pub use trigger::TriggerConfig;

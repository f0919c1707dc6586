mod duration;
mod rate;

pub use duration::SimDuration;
pub use rate::Rate;

use chrono::{DateTime, Utc};

/// Absolute simulated time in UTC
///
/// A simulated instant is always read as "epoch + SimDuration", where the
/// epoch is the offset of the owning timer.
pub type SimInstant = DateTime<Utc>;

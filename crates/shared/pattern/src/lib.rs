//! Tempora Recurrence Patterns
//!
//! Parses trigger expressions and evaluates them into lazy sequences of
//! simulated instants:
//!
//! - cron rules (`*/20 * * * * ?`)
//! - iCal recurrence rules (`FREQ=SECONDLY;INTERVAL=20`, optionally with
//!   `DTSTART`/`TZID`)
//! - ISO-8601 instants (`2024-01-01T00:00:20Z`) and durations (`PT20S`)

mod cron_rule;
mod error;
mod ical;
pub mod iso;
mod pattern;
mod sequence;

pub use cron_rule::{CronInstants, CronRule};
pub use error::{PatternError, PatternResult};
pub use ical::{IcalInstants, IcalRule};
pub use pattern::{PatternKind, RecurrencePattern};
pub use sequence::InstantSequence;

use chrono::{FixedOffset, Offset, Utc};

/// Zone given as a UTC offset in seconds; out-of-range offsets fall back to UTC
pub fn zone_from_offset(seconds: i32) -> FixedOffset {
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}

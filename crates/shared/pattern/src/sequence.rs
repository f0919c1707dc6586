use tempora_core::SimInstant;

use crate::cron_rule::CronInstants;
use crate::ical::IcalInstants;

/// Lazy, ascending, single-use sequence of fire instants
///
/// Dropping the sequence is the cancellation path: nothing beyond the
/// instants already pulled is ever computed.
pub struct InstantSequence {
    source: Source,
}

enum Source {
    Once(Option<SimInstant>),
    Cron(CronInstants),
    Ical(IcalInstants),
}

impl InstantSequence {
    pub fn once(instant: SimInstant) -> Self {
        Self {
            source: Source::Once(Some(instant)),
        }
    }

    pub fn empty() -> Self {
        Self {
            source: Source::Once(None),
        }
    }
}

impl From<CronInstants> for InstantSequence {
    fn from(instants: CronInstants) -> Self {
        Self {
            source: Source::Cron(instants),
        }
    }
}

impl From<IcalInstants> for InstantSequence {
    fn from(instants: IcalInstants) -> Self {
        Self {
            source: Source::Ical(instants),
        }
    }
}

impl Iterator for InstantSequence {
    type Item = SimInstant;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Once(instant) => instant.take(),
            Source::Cron(instants) => instants.next(),
            Source::Ical(instants) => instants.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_once_is_not_restartable() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut sequence = InstantSequence::once(instant);
        assert_eq!(sequence.next(), Some(instant));
        assert_eq!(sequence.next(), None);
        assert_eq!(sequence.next(), None);
    }

    #[test]
    fn test_empty() {
        assert_eq!(InstantSequence::empty().count(), 0);
    }
}

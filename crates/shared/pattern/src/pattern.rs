use chrono::FixedOffset;
use std::fmt;
use tempora_core::{SimDuration, SimInstant};

use crate::cron_rule::CronRule;
use crate::error::{PatternError, PatternResult};
use crate::ical::IcalRule;
use crate::iso;
use crate::sequence::InstantSequence;

/// Interpretation chosen for a pattern string
#[derive(Debug, Clone)]
pub enum PatternKind {
    /// A single absolute instant
    Instant(SimInstant),
    /// A single instant, offset from the reference start
    Offset(SimDuration),
    Cron(CronRule),
    Ical(IcalRule),
}

/// A trigger expression that evaluates to an ordered sequence of instants
///
/// Parsing tries, in order: cron rule, iCal recurrence rule, ISO-8601
/// instant, ISO-8601 duration. Only when every interpretation fails is a
/// [`PatternError::Unrecognized`] returned.
#[derive(Debug, Clone)]
pub struct RecurrencePattern {
    source: String,
    kind: PatternKind,
}

impl RecurrencePattern {
    pub fn parse(text: &str) -> PatternResult<Self> {
        let source = text.trim();
        if source.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut reasons = Vec::new();
        let kind = match CronRule::parse(source) {
            Ok(rule) => Some(PatternKind::Cron(rule)),
            Err(e) => {
                reasons.push(e.to_string());
                None
            }
        }
        .or_else(|| match IcalRule::parse(source) {
            Ok(rule) => Some(PatternKind::Ical(rule)),
            Err(e) => {
                reasons.push(e.to_string());
                None
            }
        })
        .or_else(|| match iso::parse_instant(source) {
            Ok(instant) => Some(PatternKind::Instant(instant)),
            Err(e) => {
                reasons.push(e.to_string());
                None
            }
        })
        .or_else(|| iso::parse_duration(source).ok().map(PatternKind::Offset));

        match kind {
            Some(kind) => Ok(Self {
                source: source.to_string(),
                kind,
            }),
            None => Err(PatternError::Unrecognized {
                pattern: source.to_string(),
                reasons,
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    /// Evaluate into a fresh, single-use sequence of instants
    ///
    /// Repeating the call with the same arguments yields the same sequence.
    pub fn evaluate(
        &self,
        reference_start: SimInstant,
        zone: FixedOffset,
    ) -> PatternResult<InstantSequence> {
        Ok(match &self.kind {
            PatternKind::Instant(instant) => InstantSequence::once(*instant),
            PatternKind::Offset(offset) => InstantSequence::once(offset.after(reference_start)),
            PatternKind::Cron(rule) => {
                InstantSequence::from(rule.instants(reference_start, zone))
            }
            PatternKind::Ical(rule) => InstantSequence::from(rule.instants(reference_start)?),
        })
    }
}

impl std::str::FromStr for RecurrencePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_interpretation_order() {
        assert!(matches!(
            RecurrencePattern::parse("*/20 * * * * ?").unwrap().kind(),
            PatternKind::Cron(_)
        ));
        assert!(matches!(
            RecurrencePattern::parse("FREQ=HOURLY").unwrap().kind(),
            PatternKind::Ical(_)
        ));
        assert!(matches!(
            RecurrencePattern::parse("2024-01-01T00:00:20Z").unwrap().kind(),
            PatternKind::Instant(_)
        ));
        assert!(matches!(
            RecurrencePattern::parse("PT20S").unwrap().kind(),
            PatternKind::Offset(_)
        ));
    }

    #[test]
    fn test_unparsable_pattern_fails() {
        let err = RecurrencePattern::parse("every now and then").unwrap_err();
        match err {
            PatternError::Unrecognized { pattern, reasons } => {
                assert_eq!(pattern, "every now and then");
                assert_eq!(reasons.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(RecurrencePattern::parse("   ").unwrap_err(), PatternError::Empty);
    }

    #[test]
    fn test_instant_yields_exactly_once() {
        let pattern = RecurrencePattern::parse("2024-01-01T00:00:20Z").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let fired: Vec<_> = pattern.evaluate(start, utc()).unwrap().collect();
        assert_eq!(fired, vec![Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 20).unwrap()]);
    }

    #[test]
    fn test_offset_is_relative_to_reference_start() {
        let pattern = RecurrencePattern::parse("PT1M").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let fired: Vec<_> = pattern.evaluate(start, utc()).unwrap().collect();
        assert_eq!(fired, vec![Utc.with_ymd_and_hms(2024, 1, 1, 12, 1, 0).unwrap()]);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let pattern = RecurrencePattern::parse("*/7 * * * * *").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 3).unwrap();

        let first: Vec<_> = pattern.evaluate(start, utc()).unwrap().take(10).collect();
        let second: Vec<_> = pattern.evaluate(start, utc()).unwrap().take(10).collect();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_display_keeps_source() {
        let pattern: RecurrencePattern = " 0 0 * * * * ".parse().unwrap();
        assert_eq!(pattern.to_string(), "0 0 * * * *");
    }
}

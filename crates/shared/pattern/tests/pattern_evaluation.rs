//! Pattern Evaluation Integration Test
//!
//! Exercises the public parsing/evaluation surface the way the engine uses it:
//! parse once, evaluate against a reference start, pull lazily.

use chrono::{Duration, TimeZone, Utc};
use tempora_core::SimDuration;
use tempora_pattern::{PatternError, RecurrencePattern, zone_from_offset};
use tempora_ports::TimeError;

/// Cron rule every 20s, bounded to the first 65 simulated seconds
#[test]
fn test_cron_every_twenty_seconds_within_horizon() {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let pattern = RecurrencePattern::parse("*/20 * * * * ?").unwrap();

    let offsets: Vec<SimDuration> = pattern
        .evaluate(epoch, zone_from_offset(0))
        .unwrap()
        .map(|instant| SimDuration::between(epoch, instant))
        .take_while(|offset| *offset <= SimDuration::from_secs(65))
        .collect();

    assert_eq!(
        offsets,
        vec![
            SimDuration::ZERO,
            SimDuration::from_secs(20),
            SimDuration::from_secs(40),
            SimDuration::from_secs(60),
        ]
    );
}

/// Infinite rules must be consumable lazily without hanging
#[test]
fn test_infinite_rules_are_lazy() {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for text in ["* * * * * *", "FREQ=SECONDLY"] {
        let pattern = RecurrencePattern::parse(text).unwrap();
        let mut sequence = pattern.evaluate(epoch, zone_from_offset(0)).unwrap();
        assert_eq!(sequence.next(), Some(epoch));
        assert_eq!(sequence.next(), Some(epoch + Duration::seconds(1)));
        drop(sequence);
    }
}

/// Sequences from every pattern kind are non-decreasing
#[test]
fn test_sequences_are_ordered() {
    let epoch = Utc.with_ymd_and_hms(2024, 2, 28, 23, 59, 0).unwrap();
    for text in [
        "0 * * * * *",
        "FREQ=MINUTELY;INTERVAL=7",
        "DTSTART:20240228T000000Z\nRRULE:FREQ=HOURLY;BYMINUTE=0,30",
    ] {
        let pattern = RecurrencePattern::parse(text).unwrap();
        let instants: Vec<_> = pattern
            .evaluate(epoch, zone_from_offset(0))
            .unwrap()
            .take(20)
            .collect();
        assert_eq!(instants.len(), 20, "{text}");
        assert!(instants.windows(2).all(|w| w[0] < w[1]), "{text}");
        assert!(instants[0] >= epoch, "{text}");
    }
}

/// Unparsable patterns surface as a typed parse error
#[test]
fn test_parse_error_converts_to_time_error() {
    let err = RecurrencePattern::parse("not a pattern").unwrap_err();
    assert!(matches!(err, PatternError::Unrecognized { .. }));

    let time_error: TimeError = err.into();
    match time_error {
        TimeError::PatternParse { pattern, reason } => {
            assert_eq!(pattern, "not a pattern");
            assert!(!reason.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

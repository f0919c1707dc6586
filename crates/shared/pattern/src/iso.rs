//! ISO-8601 instants and durations

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tempora_core::{SimDuration, SimInstant};

use crate::error::{PatternError, PatternResult};

/// Parse an absolute instant
///
/// Accepts RFC 3339 (`2024-01-01T00:00:20Z`), a local date-time without
/// offset (read as UTC) or a bare date (midnight UTC).
pub fn parse_instant(text: &str) -> PatternResult<SimInstant> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(PatternError::Iso(text.to_string()))
}

/// Parse a calendar-free ISO duration such as `PT20S`, `P1DT2H` or `-PT0.5S`
///
/// Years and months have no fixed length and are rejected.
pub fn parse_duration(text: &str) -> PatternResult<SimDuration> {
    let err = || PatternError::Iso(text.to_string());

    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let body = body
        .strip_prefix('P')
        .or_else(|| body.strip_prefix('p'))
        .ok_or_else(err)?;

    let mut seconds = 0.0_f64;
    let mut in_time = false;
    let mut number = String::new();
    let mut components = 0;
    let mut time_components = 0;

    for ch in body.chars() {
        match ch {
            '0'..='9' | '.' => number.push(ch),
            ',' => number.push('.'),
            'T' | 't' => {
                if in_time || !number.is_empty() {
                    return Err(err());
                }
                in_time = true;
            }
            unit => {
                let value: f64 = number.parse().map_err(|_| err())?;
                number.clear();
                let unit_seconds = match (in_time, unit.to_ascii_uppercase()) {
                    (false, 'W') => 604_800.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return Err(err()),
                };
                seconds += value * unit_seconds;
                components += 1;
                if in_time {
                    time_components += 1;
                }
            }
        }
    }

    if !number.is_empty() || components == 0 || (in_time && time_components == 0) {
        return Err(err());
    }

    let nanos = SimDuration::from_secs(1).mul_f64(seconds);
    Ok(if negative {
        SimDuration::ZERO - nanos
    } else {
        nanos
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc3339_instant() {
        let instant = parse_instant("2024-01-01T00:00:20+01:00").unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 20).unwrap());
    }

    #[test]
    fn test_local_and_date_instants_are_utc() {
        assert_eq!(
            parse_instant("2024-03-05T10:00:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_instant("2024-03-05").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_garbage_is_not_an_instant() {
        assert!(matches!(parse_instant("soon"), Err(PatternError::Iso(_))));
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration("PT20S").unwrap(), SimDuration::from_secs(20));
        assert_eq!(
            parse_duration("P1DT2H").unwrap(),
            SimDuration::from_secs(26 * 3_600)
        );
        assert_eq!(parse_duration("PT1M30S").unwrap(), SimDuration::from_secs(90));
        assert_eq!(
            parse_duration("PT0.25S").unwrap(),
            SimDuration::from_millis(250)
        );
        assert_eq!(parse_duration("-PT2S").unwrap(), SimDuration::from_secs(-2));
        assert_eq!(parse_duration("P1W").unwrap(), SimDuration::from_secs(604_800));
    }

    #[test]
    fn test_invalid_durations() {
        for text in ["P", "PT", "P1Y", "P1M", "PT5", "20S", "PT1H2X", "P1DT"] {
            assert!(parse_duration(text).is_err(), "{text} should be rejected");
        }
    }
}

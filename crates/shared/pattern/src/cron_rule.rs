//! Quartz-style cron rules

use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use std::str::FromStr;
use tempora_core::SimInstant;

use crate::error::{PatternError, PatternResult};

/// A parsed cron rule with a seconds field
///
/// Accepts six or seven fields (`sec min hour dom month dow [year]`) and the
/// classic five-field form, which fires at second zero. Quartz's `?`
/// ("no specific value") is read as `*`.
#[derive(Debug, Clone)]
pub struct CronRule {
    schedule: Schedule,
}

impl CronRule {
    pub fn parse(text: &str) -> PatternResult<Self> {
        let mut fields: Vec<&str> = text
            .split_whitespace()
            .map(|field| if field == "?" { "*" } else { field })
            .collect();

        match fields.len() {
            5 => fields.insert(0, "0"),
            6 | 7 => {}
            n => {
                return Err(PatternError::Cron(format!(
                    "expected 5 to 7 fields, found {n}"
                )));
            }
        }

        let schedule = Schedule::from_str(&fields.join(" "))
            .map_err(|e| PatternError::Cron(e.to_string()))?;
        Ok(Self { schedule })
    }

    /// Lazily enumerate fire times at or after `start`
    pub fn instants(&self, start: SimInstant, zone: FixedOffset) -> CronInstants {
        // The schedule yields times strictly after its cursor; backing off one
        // nanosecond makes a whole-second start inclusive.
        let cursor = (start - chrono::Duration::nanoseconds(1)).with_timezone(&zone);
        CronInstants {
            schedule: self.schedule.clone(),
            cursor,
            exhausted: false,
        }
    }
}

/// Fire times of a cron rule, computed one at a time
pub struct CronInstants {
    schedule: Schedule,
    cursor: DateTime<FixedOffset>,
    exhausted: bool,
}

impl Iterator for CronInstants {
    type Item = SimInstant;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.schedule.after(&self.cursor).next() {
            Some(next) => {
                self.cursor = next;
                Some(next.with_timezone(&Utc))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_every_twenty_seconds_includes_start() {
        let rule = CronRule::parse("*/20 * * * * ?").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let fired: Vec<_> = rule.instants(start, utc()).take(4).collect();
        assert_eq!(
            fired,
            vec![
                start,
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 20).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 40).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_five_field_form_fires_on_the_minute() {
        let rule = CronRule::parse("*/15 * * * *").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 7, 30).unwrap();

        let first = rule.instants(start, utc()).next().unwrap();
        assert_eq!(first, Utc.with_ymd_and_hms(2024, 1, 1, 0, 15, 0).unwrap());
    }

    #[test]
    fn test_zone_shifts_wall_fields() {
        // 09:00 in UTC+02:00 is 07:00 UTC
        let rule = CronRule::parse("0 0 9 * * *").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let zone = FixedOffset::east_opt(2 * 3_600).unwrap();

        let first = rule.instants(start, zone).next().unwrap();
        assert_eq!(first, Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_bounded_year_rule_completes() {
        let rule = CronRule::parse("0 0 0 1 1 * 2024").unwrap();
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();

        let fired: Vec<_> = rule.instants(start, utc()).collect();
        assert_eq!(fired, vec![Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()]);
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        assert!(matches!(CronRule::parse("* *"), Err(PatternError::Cron(_))));
        assert!(CronRule::parse("2024-01-01T00:00:00Z").is_err());
    }
}

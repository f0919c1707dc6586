//! iCalendar recurrence rules (RFC 5545 `RRULE`)

use chrono::{Duration, Utc};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};
use std::collections::VecDeque;
use tempora_core::SimInstant;

use crate::error::{PatternError, PatternResult};

/// Dates fetched from the rule set per refill
const BATCH: u16 = 64;

/// A recurrence rule, optionally anchored by its own `DTSTART`
///
/// Two forms are accepted:
/// - a full block with `DTSTART` (and optional `TZID`), e.g.
///   `DTSTART;TZID=Europe/Amsterdam:20240101T090000\nRRULE:FREQ=DAILY`
/// - a bare rule (`FREQ=SECONDLY;INTERVAL=20` or `RRULE:FREQ=...`), which is
///   anchored at the reference start when evaluated
#[derive(Debug, Clone)]
pub struct IcalRule {
    anchored: Option<RRuleSet>,
    bare: Option<RRule<Unvalidated>>,
}

impl IcalRule {
    pub fn parse(text: &str) -> PatternResult<Self> {
        let text = text.trim().replace("\\n", "\n");
        if !text.to_ascii_uppercase().contains("FREQ=") {
            return Err(PatternError::Ical("missing FREQ".to_string()));
        }

        if text.to_ascii_uppercase().contains("DTSTART") {
            let set: RRuleSet = text
                .parse()
                .map_err(|e: rrule::RRuleError| PatternError::Ical(e.to_string()))?;
            return Ok(Self {
                anchored: Some(set),
                bare: None,
            });
        }

        let body = text
            .strip_prefix("RRULE:")
            .or_else(|| text.strip_prefix("rrule:"))
            .unwrap_or(text.as_str());
        let rule: RRule<Unvalidated> = body
            .parse()
            .map_err(|e: rrule::RRuleError| PatternError::Ical(e.to_string()))?;
        // Validate once against an arbitrary anchor so bad rules fail at parse time
        rule.clone()
            .build(Utc::now().with_timezone(&Tz::UTC))
            .map_err(|e| PatternError::Ical(e.to_string()))?;
        Ok(Self {
            anchored: None,
            bare: Some(rule),
        })
    }

    /// Lazily enumerate occurrences at or after `start`
    pub fn instants(&self, start: SimInstant) -> PatternResult<IcalInstants> {
        let set = match (&self.anchored, &self.bare) {
            (Some(set), _) => set.clone(),
            (None, Some(rule)) => rule
                .clone()
                .build(start.with_timezone(&Tz::UTC))
                .map_err(|e| PatternError::Ical(e.to_string()))?,
            (None, None) => return Err(PatternError::Ical("empty rule".to_string())),
        };
        Ok(IcalInstants {
            set,
            floor: start,
            last: None,
            buffer: VecDeque::new(),
            exhausted: false,
        })
    }
}

/// Occurrences of a recurrence rule, fetched in small batches
pub struct IcalInstants {
    set: RRuleSet,
    floor: SimInstant,
    last: Option<SimInstant>,
    buffer: VecDeque<SimInstant>,
    exhausted: bool,
}

impl IcalInstants {
    fn refill(&mut self) {
        // Whether `after` is inclusive does not matter: results are filtered
        // against the last emitted date.
        let from = self.last.unwrap_or(self.floor - Duration::seconds(1));
        let result = self
            .set
            .clone()
            .after(from.with_timezone(&Tz::UTC))
            .all(BATCH);

        let last = self.last;
        let floor = self.floor;
        self.buffer.extend(
            result
                .dates
                .into_iter()
                .map(|date| date.with_timezone(&Utc))
                .filter(|date| match last {
                    Some(last) => *date > last,
                    None => *date >= floor,
                }),
        );
        if self.buffer.is_empty() {
            self.exhausted = true;
        }
    }
}

impl Iterator for IcalInstants {
    type Item = SimInstant;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            self.refill();
        }
        let next = self.buffer.pop_front()?;
        self.last = Some(next);
        Some(next)
    }
}

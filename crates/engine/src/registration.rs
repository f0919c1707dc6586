use log::debug;
use serde::Serialize;
use std::collections::VecDeque;
use tempora_core::{ClockId, SimDuration, SimInstant, TriggerEvent, TriggerId};
use tempora_ports::{TimeError, TimeResult};

use crate::bus::{EventBus, Subscription};

/// Clock-relative fire times of one registration
pub type FireTimes = Box<dyn Iterator<Item = SimDuration> + Send>;

/// Reporting view of one live registration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerStatus {
    pub id: TriggerId,
    pub clock_id: ClockId,
    pub pattern: String,
    pub next_fire: Option<SimDuration>,
    pub delivered: u64,
    pub recent: Vec<TriggerEvent>,
}

/// A pattern bound to a clock, with one instant of lookahead
///
/// The lookahead is what lets a fire know whether it is the last one: the
/// sequence is exhausted, or its next instant lies beyond the clock's bound.
pub(crate) struct TriggerRegistration {
    id: TriggerId,
    clock_id: ClockId,
    pattern: String,
    times: FireTimes,
    scheduled: Option<SimDuration>,
    lookahead: Option<SimDuration>,
    last_pulled: Option<SimDuration>,
    delivered: u64,
    recent: VecDeque<TriggerEvent>,
    recent_capacity: usize,
    bus: EventBus<TriggerEvent>,
}

impl TriggerRegistration {
    pub(crate) fn new(
        id: TriggerId,
        clock_id: ClockId,
        pattern: String,
        times: FireTimes,
        recent_capacity: usize,
    ) -> Self {
        Self {
            id,
            clock_id,
            pattern,
            times,
            scheduled: None,
            lookahead: None,
            last_pulled: None,
            delivered: 0,
            recent: VecDeque::with_capacity(recent_capacity),
            recent_capacity,
            bus: EventBus::new(),
        }
    }

    pub(crate) fn subscribe(&mut self) -> Subscription<TriggerEvent> {
        self.bus.subscribe()
    }

    /// Pull the first fire time and the lookahead behind it
    ///
    /// Fire times earlier than `not_before` are moved up to it and merged
    /// into a single fire.
    pub(crate) fn prime(&mut self, not_before: SimDuration) -> TimeResult<Option<SimDuration>> {
        self.scheduled = self.pull()?.map(|at| at.max(not_before));
        self.pull_lookahead()?;
        Ok(self.scheduled)
    }

    pub(crate) fn scheduled(&self) -> Option<SimDuration> {
        self.scheduled
    }

    /// Deliver one fire at clock time `at`
    ///
    /// Returns the event that was published; `is_last` is set when nothing
    /// remains at or before `until`.
    pub(crate) fn fire(
        &mut self,
        at: SimDuration,
        instant: SimInstant,
        until: Option<SimDuration>,
    ) -> TriggerEvent {
        let is_last = match self.lookahead {
            None => true,
            Some(next) => until.is_some_and(|until| next > until),
        };
        let event = TriggerEvent {
            trigger_id: self.id,
            clock_id: self.clock_id.clone(),
            time: at,
            instant,
            is_last,
        };

        let reached = self.bus.publish(event.clone());
        debug!(
            "Trigger {} fired at {} on clock {} ({} subscribers, last: {})",
            self.id, at, self.clock_id, reached, is_last
        );

        self.delivered += 1;
        if self.recent_capacity > 0 {
            if self.recent.len() == self.recent_capacity {
                self.recent.pop_front();
            }
            self.recent.push_back(event.clone());
        }
        event
    }

    /// Drop lookahead instants a fire at `at` already covers
    ///
    /// Call before [`fire`](Self::fire) when the clock may be past the
    /// scheduled time, so `is_last` sees what is really left.
    pub(crate) fn cover(&mut self, at: SimDuration) -> TimeResult<()> {
        while self.lookahead.is_some_and(|next| next <= at) {
            self.lookahead = self.pull()?;
        }
        Ok(())
    }

    /// Shift the lookahead in as the next fire time and pull a new lookahead
    pub(crate) fn advance(&mut self, fired_at: SimDuration) -> TimeResult<Option<SimDuration>> {
        self.cover(fired_at)?;
        self.scheduled = self.lookahead.take();
        self.pull_lookahead()?;
        Ok(self.scheduled)
    }

    /// Pull the instant after `scheduled`, skipping any it already covers
    fn pull_lookahead(&mut self) -> TimeResult<()> {
        self.lookahead = None;
        let Some(scheduled) = self.scheduled else {
            return Ok(());
        };
        self.lookahead = self.pull()?;
        self.cover(scheduled)
    }

    /// Route an error to this registration's subscribers only
    pub(crate) fn fail(&mut self, error: TimeError) {
        self.bus.publish_error(error);
    }

    pub(crate) fn status(&self) -> TriggerStatus {
        TriggerStatus {
            id: self.id,
            clock_id: self.clock_id.clone(),
            pattern: self.pattern.clone(),
            next_fire: self.scheduled,
            delivered: self.delivered,
            recent: self.recent.iter().cloned().collect(),
        }
    }

    /// Next strictly later time from the sequence
    ///
    /// Repeated instants are skipped; an instant earlier than the previous
    /// one means the sequence is not ordered, which is an error for this
    /// registration.
    fn pull(&mut self) -> TimeResult<Option<SimDuration>> {
        loop {
            let Some(next) = self.times.next() else {
                return Ok(None);
            };
            match self.last_pulled {
                Some(previous) if next == previous => continue,
                Some(previous) if next < previous => {
                    return Err(TimeError::PatternParse {
                        pattern: self.pattern.clone(),
                        reason: format!("sequence went back from {previous} to {next}"),
                    });
                }
                _ => {
                    self.last_pulled = Some(next);
                    return Ok(Some(next));
                }
            }
        }
    }
}

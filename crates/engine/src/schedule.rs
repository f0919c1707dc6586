//! Pending-fire indexes
//!
//! The driver keeps every registration's next fire time in one of these.
//! Both answer "what fires next, and when"; they differ in how ties at the
//! same time are ordered:
//!
//! - [`ReactiveSchedule`]: navigable time index, ties in trigger-id order
//! - [`DiscreteEventSchedule`]: future-event list, ties in scheduling order

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tempora_core::{SimDuration, TriggerId};

use crate::config::EngineKind;
use crate::des::{DesScheduler, EventId};

/// Index of pending fire times keyed by trigger
///
/// Each trigger has at most one pending entry; inserting again moves it.
pub trait TriggerSchedule: Send + 'static {
    fn kind(&self) -> EngineKind;

    fn insert(&mut self, at: SimDuration, trigger: TriggerId);

    /// Drop the pending entry for `trigger`, returning its time
    fn remove(&mut self, trigger: &TriggerId) -> Option<SimDuration>;

    /// Earliest pending time
    fn next_time(&self) -> Option<SimDuration>;

    /// Remove every entry at the earliest pending time
    fn pop_batch(&mut self) -> Option<(SimDuration, Vec<TriggerId>)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// Time-indexed map of pending triggers
#[derive(Debug, Default)]
pub struct ReactiveSchedule {
    by_time: BTreeMap<SimDuration, BTreeSet<TriggerId>>,
    by_trigger: HashMap<TriggerId, SimDuration>,
}

impl ReactiveSchedule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerSchedule for ReactiveSchedule {
    fn kind(&self) -> EngineKind {
        EngineKind::Reactive
    }

    fn insert(&mut self, at: SimDuration, trigger: TriggerId) {
        self.remove(&trigger);
        self.by_time.entry(at).or_default().insert(trigger);
        self.by_trigger.insert(trigger, at);
    }

    fn remove(&mut self, trigger: &TriggerId) -> Option<SimDuration> {
        let at = self.by_trigger.remove(trigger)?;
        if let Some(bucket) = self.by_time.get_mut(&at) {
            bucket.remove(trigger);
            if bucket.is_empty() {
                self.by_time.remove(&at);
            }
        }
        Some(at)
    }

    fn next_time(&self) -> Option<SimDuration> {
        self.by_time.keys().next().copied()
    }

    fn pop_batch(&mut self) -> Option<(SimDuration, Vec<TriggerId>)> {
        let (at, bucket) = self.by_time.pop_first()?;
        for trigger in &bucket {
            self.by_trigger.remove(trigger);
        }
        Some((at, bucket.into_iter().collect()))
    }

    fn len(&self) -> usize {
        self.by_trigger.len()
    }

    fn clear(&mut self) {
        self.by_time.clear();
        self.by_trigger.clear();
    }
}

/// Future-event list of pending triggers
#[derive(Default)]
pub struct DiscreteEventSchedule {
    events: DesScheduler<TriggerId>,
    pending: HashMap<TriggerId, (EventId, SimDuration)>,
}

impl DiscreteEventSchedule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerSchedule for DiscreteEventSchedule {
    fn kind(&self) -> EngineKind {
        EngineKind::DiscreteEvent
    }

    fn insert(&mut self, at: SimDuration, trigger: TriggerId) {
        self.remove(&trigger);
        let at = at.max(self.events.now());
        let event = self.events.schedule(at, trigger);
        self.pending.insert(trigger, (event, at));
    }

    fn remove(&mut self, trigger: &TriggerId) -> Option<SimDuration> {
        let (event, at) = self.pending.remove(trigger)?;
        self.events.cancel(event).map(|_| at)
    }

    fn next_time(&self) -> Option<SimDuration> {
        self.events.peek_time()
    }

    fn pop_batch(&mut self) -> Option<(SimDuration, Vec<TriggerId>)> {
        let (at, batch) = self.events.pop_batch()?;
        for trigger in &batch {
            self.pending.remove(trigger);
        }
        Some((at, batch))
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn clear(&mut self) {
        self.events.clear();
        self.pending.clear();
    }
}

//! Discrete-event scheduler
//!
//! A future-event list ordered by `(time, sequence)`: the earliest event is
//! always next, and events scheduled for the same time come out in the
//! order they were scheduled. The scheduler has its own notion of "now"
//! that only moves forward as events are popped.

use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashMap;
use tempora_core::SimDuration;

/// Handle for cancelling a scheduled event
pub type EventId = u64;

pub struct DesScheduler<E> {
    queue: PriorityQueue<EventId, Reverse<(SimDuration, EventId)>>,
    payloads: HashMap<EventId, E>,
    now: SimDuration,
    next_id: EventId,
}

impl<E> DesScheduler<E> {
    pub fn new() -> Self {
        Self::starting_at(SimDuration::ZERO)
    }

    pub fn starting_at(now: SimDuration) -> Self {
        Self {
            queue: PriorityQueue::new(),
            payloads: HashMap::new(),
            now,
            next_id: 0,
        }
    }

    pub fn now(&self) -> SimDuration {
        self.now
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Schedule `payload` at `at`; times before "now" are clamped to "now"
    pub fn schedule(&mut self, at: SimDuration, payload: E) -> EventId {
        let at = at.max(self.now);
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(id, Reverse((at, id)));
        self.payloads.insert(id, payload);
        id
    }

    /// Remove a pending event, returning its payload if it was still pending
    pub fn cancel(&mut self, id: EventId) -> Option<E> {
        self.queue.remove(&id)?;
        self.payloads.remove(&id)
    }

    /// Time of the earliest pending event
    pub fn peek_time(&self) -> Option<SimDuration> {
        self.queue.peek().map(|(_, Reverse((at, _)))| *at)
    }

    /// Pop the earliest event and move "now" to its time
    pub fn pop_next(&mut self) -> Option<(SimDuration, E)> {
        let (id, Reverse((at, _))) = self.queue.pop()?;
        self.now = self.now.max(at);
        let payload = self.payloads.remove(&id)?;
        Some((at, payload))
    }

    /// Pop every event sharing the earliest time, in scheduling order
    pub fn pop_batch(&mut self) -> Option<(SimDuration, Vec<E>)> {
        let at = self.peek_time()?;
        let mut batch = Vec::new();
        while self.peek_time() == Some(at) {
            if let Some((_, payload)) = self.pop_next() {
                batch.push(payload);
            }
        }
        Some((at, batch))
    }

    /// Pop every event due at or before `until`, moving "now" to `until`
    pub fn pop_due(&mut self, until: SimDuration) -> Vec<(SimDuration, E)> {
        let mut due = Vec::new();
        while self.peek_time().is_some_and(|at| at <= until) {
            if let Some(event) = self.pop_next() {
                due.push(event);
            }
        }
        self.now = self.now.max(until);
        due
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.payloads.clear();
    }
}

impl<E> Default for DesScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

//! Clock driver
//!
//! One task per clock owns all of that clock's state. Callers talk to it
//! through [`Command`]s with a oneshot reply, so every mutation of a clock
//! is serialized without locks. Between commands the driver sleeps until
//! the wall-clock deadline of the next due target, computed by the
//! [`Pacer`] from the drag offset and pace.

use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tempora_clock::Pacer;
use tempora_core::{
    ClockChange, ClockConfig, ClockEvent, ClockStatus, Rate, SimDuration, SimInstant,
    TriggerEvent, TriggerId,
};
use tempora_ports::{TimeError, TimeResult, WallClock};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::bus::{EventBus, Subscription};
use crate::config::{EngineContext, EngineSettings};
use crate::registration::{FireTimes, TriggerRegistration, TriggerStatus};
use crate::schedule::TriggerSchedule;

type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Command {
    Start(Reply<TimeResult<()>>),
    Pause(Reply<TimeResult<()>>),
    SetStatus(ClockStatus, Reply<TimeResult<()>>),
    AdvanceTo(SimDuration, Reply<TimeResult<()>>),
    Apply(Vec<ClockChange>, Reply<TimeResult<()>>),
    SetDefaultUntil(Option<SimDuration>, Reply<()>),
    Register {
        id: TriggerId,
        pattern: String,
        times: FireTimes,
        reply: Reply<Subscription<TriggerEvent>>,
    },
    Unregister(TriggerId, Reply<bool>),
    Observe(Reply<Subscription<ClockEvent>>),
    Triggers(Reply<Vec<TriggerStatus>>),
    Shutdown(Reply<()>),
}

/// What the clock is waiting for next while running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Fire(SimDuration),
    Complete(SimDuration),
}

impl Target {
    fn time(self) -> SimDuration {
        match self {
            Target::Fire(at) | Target::Complete(at) => at,
        }
    }
}

/// Latest state shared with the handle
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) config: ClockConfig,
    pacer: Pacer,
    /// Earliest of the next pending fire and the completion bound
    horizon: Option<SimDuration>,
}

impl Snapshot {
    pub(crate) fn new(config: ClockConfig, pacer: Pacer) -> Self {
        Self {
            config,
            pacer,
            horizon: None,
        }
    }

    /// Config with the time a paced running clock has reached by `now`
    pub(crate) fn live(&self, now: Instant) -> ClockConfig {
        let mut config = self.config.clone();
        if config.status == ClockStatus::Running && !self.pacer.is_unconstrained() {
            let mut reached = self.pacer.estimate(now);
            if let Some(horizon) = self.horizon {
                reached = reached.min(horizon);
            }
            config.time = reached.max(config.time);
        }
        config
    }
}

pub(crate) struct ClockDriver<S> {
    config: ClockConfig,
    default_until: Option<SimDuration>,
    epoch: SimInstant,
    schedule: S,
    registrations: HashMap<TriggerId, TriggerRegistration>,
    pacer: Pacer,
    wall: Arc<dyn WallClock>,
    settings: EngineSettings,
    events: Option<EventBus<ClockEvent>>,
    snapshot: watch::Sender<Snapshot>,
}

impl<S: TriggerSchedule> ClockDriver<S> {
    pub(crate) fn new(
        config: ClockConfig,
        context: EngineContext,
        schedule: S,
        pacer: Pacer,
        snapshot: watch::Sender<Snapshot>,
    ) -> Self {
        Self {
            default_until: context.default_until,
            epoch: context.epoch,
            schedule,
            registrations: HashMap::new(),
            pacer,
            wall: context.wall,
            events: Some(EventBus::new()),
            settings: context.settings,
            snapshot,
            config,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(
            "Clock {} driver started ({} schedule, status {})",
            self.config.id,
            self.schedule.kind(),
            self.config.status
        );

        // A clock seeded as running starts from its seeded time
        if self.config.status == ClockStatus::Running {
            self.config.status = ClockStatus::Waiting;
            self.start();
        }

        loop {
            let wake = self.next_wake();
            let deadline = wake.unwrap_or_else(|| self.wall.now());

            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle(command) {
                            break;
                        }
                    }
                    None => {
                        self.close("all handles dropped");
                        break;
                    }
                },
                _ = tokio::time::sleep_until(deadline), if wake.is_some() => self.on_due(),
            }
            self.refresh_snapshot();
        }

        info!("Clock {} driver stopped at {}", self.config.id, self.config.time);
    }

    /// Returns false once the driver should stop
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Start(reply) => {
                self.start();
                let _ = reply.send(Ok(()));
            }
            Command::Pause(reply) => {
                self.pause();
                let _ = reply.send(Ok(()));
            }
            Command::SetStatus(status, reply) => {
                self.set_status(status);
                let _ = reply.send(Ok(()));
            }
            Command::AdvanceTo(time, reply) => {
                let _ = reply.send(self.advance_to(time));
            }
            Command::Apply(changes, reply) => {
                let _ = reply.send(self.apply(changes));
            }
            Command::SetDefaultUntil(until, reply) => {
                self.default_until = until;
                self.complete_if_reached();
                let _ = reply.send(());
            }
            Command::Register {
                id,
                pattern,
                times,
                reply,
            } => {
                let _ = reply.send(self.register(id, pattern, times));
            }
            Command::Unregister(id, reply) => {
                let _ = reply.send(self.unregister(&id));
            }
            Command::Observe(reply) => {
                let subscription = match &mut self.events {
                    Some(bus) => bus.subscribe(),
                    None => Subscription::closed(),
                };
                let _ = reply.send(subscription);
            }
            Command::Triggers(reply) => {
                let mut statuses: Vec<_> =
                    self.registrations.values().map(|r| r.status()).collect();
                statuses.sort_by_key(|status| status.id);
                let _ = reply.send(statuses);
            }
            Command::Shutdown(reply) => {
                self.close("shutdown requested");
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    // ---- Time ----

    fn effective_until(&self) -> Option<SimDuration> {
        self.config.until.or(self.default_until)
    }

    fn next_target(&self) -> Option<Target> {
        let until = self.effective_until();
        match (self.schedule.next_time(), until) {
            (Some(next), Some(until)) if next > until => Some(Target::Complete(until)),
            (Some(next), _) => Some(Target::Fire(next)),
            // Unconstrained clocks only move on events
            (None, Some(until)) if !self.pacer.is_unconstrained() => {
                Some(Target::Complete(until))
            }
            (None, _) => None,
        }
    }

    fn next_wake(&self) -> Option<Instant> {
        if self.config.status != ClockStatus::Running {
            return None;
        }
        let target = self.next_target()?;
        Some(
            self.pacer
                .deadline(target.time())
                .unwrap_or_else(|| self.wall.now()),
        )
    }

    fn horizon(&self) -> Option<SimDuration> {
        match (self.schedule.next_time(), self.effective_until()) {
            (Some(next), Some(until)) => Some(next.min(until)),
            (next, until) => next.or(until),
        }
    }

    /// Clock time reached by now, capped at the horizon
    fn reached_time(&self) -> SimDuration {
        let mut reached = self.pacer.estimate(self.wall.now());
        if let Some(horizon) = self.horizon() {
            reached = reached.min(horizon);
        }
        reached.max(self.config.time)
    }

    /// Move time forward, publishing when it changed
    fn move_time(&mut self, time: SimDuration) {
        if time > self.config.time {
            self.config.time = time;
            self.publish();
        }
    }

    fn on_due(&mut self) {
        match self.next_target() {
            Some(Target::Fire(_)) => self.fire_next(),
            Some(Target::Complete(until)) => {
                self.move_time(until);
                self.finish(ClockStatus::Completed);
            }
            None => {}
        }
    }

    /// Fire every registration due at the earliest pending time
    fn fire_next(&mut self) {
        let Some((key, due)) = self.schedule.pop_batch() else {
            return;
        };
        let at = key.max(self.config.time);
        self.move_time(at);

        let until = self.effective_until();
        let instant = at.after(self.epoch);
        for id in due {
            let Some(registration) = self.registrations.get_mut(&id) else {
                continue;
            };
            if let Err(error) = registration.cover(at) {
                warn!("Trigger {} failed on clock {}: {}", id, self.config.id, error);
                registration.fail(error);
                self.registrations.remove(&id);
                continue;
            }
            registration.fire(at, instant, until);
            match registration.advance(at) {
                Ok(Some(next)) => self.schedule.insert(next, id),
                Ok(None) => {
                    debug!("Trigger {} exhausted on clock {}", id, self.config.id);
                    self.registrations.remove(&id);
                }
                Err(error) => {
                    warn!("Trigger {} failed on clock {}: {}", id, self.config.id, error);
                    registration.fail(error);
                    self.registrations.remove(&id);
                }
            }
        }

        if until.is_some_and(|until| at >= until) {
            self.finish(ClockStatus::Completed);
        }
    }

    fn advance_to(&mut self, target: SimDuration) -> TimeResult<()> {
        if self.config.status != ClockStatus::Running {
            return Err(TimeError::NotRunning {
                clock_id: self.config.id.clone(),
                status: self.config.status,
            });
        }
        if target < self.config.time {
            let error = self.time_travel(target);
            self.fail(error.clone());
            return Err(error);
        }

        let bound = match self.effective_until() {
            Some(until) => target.min(until),
            None => target,
        };
        while self.config.status == ClockStatus::Running
            && self.schedule.next_time().is_some_and(|next| next <= bound)
        {
            self.fire_next();
        }

        if self.config.status == ClockStatus::Running {
            self.move_time(bound);
            self.pacer
                .rebase(self.wall.now(), self.config.time, self.config.pace);
            self.complete_if_reached();
        }
        Ok(())
    }

    fn time_travel(&self, requested: SimDuration) -> TimeError {
        TimeError::InvalidTimeTravel {
            clock_id: self.config.id.clone(),
            current: self.config.time,
            requested,
        }
    }

    fn complete_if_reached(&mut self) {
        if self.config.status != ClockStatus::Running {
            return;
        }
        if let Some(until) = self.effective_until() {
            if self.config.time >= until {
                self.finish(ClockStatus::Completed);
            }
        }
    }

    // ---- Status ----

    fn start(&mut self) {
        match self.config.status {
            ClockStatus::Waiting => {
                self.pacer
                    .rebase(self.wall.now(), self.config.time, self.config.pace);
                self.config.status = ClockStatus::Running;
                info!(
                    "Clock {} running from {} (pace {})",
                    self.config.id,
                    self.config.time,
                    describe_pace(self.config.pace)
                );
                self.publish();
                self.complete_if_reached();
            }
            status => warn!("Clock {} is {}, start ignored", self.config.id, status),
        }
    }

    fn pause(&mut self) {
        match self.config.status {
            ClockStatus::Running => {
                self.config.time = self.reached_time();
                self.config.status = ClockStatus::Waiting;
                info!("Clock {} paused at {}", self.config.id, self.config.time);
                self.publish();
            }
            status => warn!("Clock {} is {}, pause ignored", self.config.id, status),
        }
    }

    fn set_status(&mut self, status: ClockStatus) {
        let current = self.config.status;
        if current.is_terminal() || current == status {
            warn!(
                "Clock {} is {}, request for {} ignored",
                self.config.id, current, status
            );
            return;
        }
        match status {
            ClockStatus::Running => self.start(),
            ClockStatus::Waiting => self.pause(),
            ClockStatus::Completed | ClockStatus::Failed => {
                if current == ClockStatus::Running {
                    self.config.time = self.reached_time();
                }
                self.finish(status);
            }
        }
    }

    fn fail(&mut self, error: TimeError) {
        error!("Clock {} failed: {}", self.config.id, error);
        for registration in self.registrations.values_mut() {
            registration.fail(error.clone());
        }
        self.finish(ClockStatus::Failed);
    }

    /// Enter a terminal status and complete every stream of this clock
    fn finish(&mut self, status: ClockStatus) {
        self.config.status = status;
        info!("Clock {} {} at {}", self.config.id, status, self.config.time);
        self.publish();
        self.close("terminal status");
    }

    fn close(&mut self, reason: &str) {
        debug!(
            "Closing clock {} streams ({}): {} triggers",
            self.config.id,
            reason,
            self.registrations.len()
        );
        self.schedule.clear();
        self.registrations.clear();
        self.events = None;
    }

    fn publish(&mut self) {
        self.refresh_snapshot();
        if let Some(bus) = &mut self.events {
            bus.publish(ClockEvent::snapshot(&self.config));
        }
    }

    fn refresh_snapshot(&self) {
        self.snapshot.send_replace(Snapshot {
            config: self.config.clone(),
            pacer: self.pacer,
            horizon: self.horizon(),
        });
    }

    // ---- Config ----

    fn apply(&mut self, changes: Vec<ClockChange>) -> TimeResult<()> {
        for change in changes {
            if self.config.status.is_terminal() {
                warn!(
                    "Clock {} is {}, ignoring {:?}",
                    self.config.id, self.config.status, change
                );
                continue;
            }
            debug!("Clock {} applying {:?}", self.config.id, change);
            match change {
                ClockChange::Pace(pace) => self.set_pace(pace),
                ClockChange::Until(until) => {
                    self.config.until = until;
                    self.publish();
                    self.complete_if_reached();
                }
                ClockChange::SlaveTimeout(timeout) => {
                    self.config.slave_timeout = timeout;
                    self.refresh_snapshot();
                }
                ClockChange::Time(time) => self.set_time(time)?,
                ClockChange::Status(status) => self.set_status(status),
            }
        }
        Ok(())
    }

    fn set_pace(&mut self, pace: Option<Rate>) {
        if self.config.status == ClockStatus::Running {
            self.config.time = self.reached_time();
            self.pacer.rebase(self.wall.now(), self.config.time, pace);
        }
        self.config.pace = pace;
        self.publish();
    }

    fn set_time(&mut self, time: SimDuration) -> TimeResult<()> {
        if self.config.status == ClockStatus::Running {
            return self.advance_to(time);
        }
        if time < self.config.time {
            let error = self.time_travel(time);
            self.fail(error.clone());
            return Err(error);
        }
        self.move_time(time);
        Ok(())
    }

    // ---- Triggers ----

    fn register(
        &mut self,
        id: TriggerId,
        pattern: String,
        times: FireTimes,
    ) -> Subscription<TriggerEvent> {
        if self.config.status.is_terminal() {
            warn!(
                "Clock {} is {}, trigger {} gets an empty stream",
                self.config.id, self.config.status, id
            );
            return Subscription::closed();
        }
        self.unregister(&id);

        let mut registration = TriggerRegistration::new(
            id,
            self.config.id.clone(),
            pattern,
            times,
            self.settings.recent_events,
        );
        let subscription = registration.subscribe();
        let not_before = match self.config.status {
            ClockStatus::Running => self.reached_time(),
            _ => self.config.time,
        };

        match registration.prime(not_before) {
            Ok(Some(first)) => {
                debug!(
                    "Trigger {} registered on clock {}, first fire at {}",
                    id, self.config.id, first
                );
                self.schedule.insert(first, id);
                self.registrations.insert(id, registration);
            }
            Ok(None) => debug!("Trigger {} has no instants, completing", id),
            Err(error) => {
                warn!("Trigger {} rejected on clock {}: {}", id, self.config.id, error);
                registration.fail(error);
            }
        }
        subscription
    }

    fn unregister(&mut self, id: &TriggerId) -> bool {
        self.schedule.remove(id);
        let removed = self.registrations.remove(id).is_some();
        if removed {
            debug!("Trigger {} unregistered from clock {}", id, self.config.id);
        }
        removed
    }
}

fn describe_pace(pace: Option<Rate>) -> String {
    match pace {
        Some(rate) if !rate.is_unconstrained() => rate.to_string(),
        _ => "unconstrained".to_string(),
    }
}

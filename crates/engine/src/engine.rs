use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use tempora_clock::Pacer;
use tempora_core::{
    ClockChange, ClockConfig, ClockEvent, ClockId, ClockStatus, SimDuration, TriggerEvent,
    TriggerId,
};
use tempora_ports::{TimeError, TimeResult, WallClock};
use tokio::sync::{mpsc, oneshot, watch};

use crate::bus::Subscription;
use crate::config::{EngineContext, EngineKind};
use crate::driver::{ClockDriver, Command, Snapshot};
use crate::registration::{FireTimes, TriggerStatus};
use crate::schedule::{DiscreteEventSchedule, ReactiveSchedule, TriggerSchedule};

/// Contract shared by every clock engine strategy
///
/// An engine owns one clock: its time, status, pacing, pending triggers and
/// event streams. Status requests that do not apply to the current status
/// are logged and ignored rather than rejected.
#[async_trait]
pub trait ClockEngine: Send + Sync {
    fn clock_id(&self) -> &ClockId;

    fn kind(&self) -> EngineKind;

    /// Current config, with the time a paced clock has reached so far
    fn config(&self) -> ClockConfig;

    /// WAITING -> RUNNING
    async fn start(&self) -> TimeResult<()>;

    /// RUNNING -> WAITING, keeping the time reached
    async fn pause(&self) -> TimeResult<()>;

    async fn set_status(&self, status: ClockStatus) -> TimeResult<()>;

    /// Jump a running clock forward, firing everything due on the way
    ///
    /// Moving backwards fails the clock.
    async fn advance_time_to(&self, time: SimDuration) -> TimeResult<()>;

    /// Apply property changes in order
    async fn apply(&self, changes: Vec<ClockChange>) -> TimeResult<()>;

    /// Completion bound for a clock without its own `until`
    async fn set_default_until(&self, until: Option<SimDuration>) -> TimeResult<()>;

    /// Schedule a sequence of clock-relative fire times
    ///
    /// Re-registering an id replaces the previous registration.
    async fn register(
        &self,
        id: TriggerId,
        pattern: String,
        times: FireTimes,
    ) -> TimeResult<Subscription<TriggerEvent>>;

    /// Returns whether the trigger was registered; repeating is harmless
    async fn unregister(&self, id: TriggerId) -> TimeResult<bool>;

    async fn observe(&self) -> TimeResult<Subscription<ClockEvent>>;

    async fn triggers(&self) -> TimeResult<Vec<TriggerStatus>>;

    /// Stop the engine and complete all its streams
    async fn shutdown(&self);
}

/// Create an engine for `config` using the strategy in the context settings
///
/// Must be called from within a tokio runtime.
pub fn spawn_engine(config: ClockConfig, context: EngineContext) -> Arc<dyn ClockEngine> {
    match context.settings.kind {
        EngineKind::Reactive => {
            Arc::new(ClockHandle::spawn(config, context, ReactiveSchedule::new()))
        }
        EngineKind::DiscreteEvent => Arc::new(ClockHandle::spawn(
            config,
            context,
            DiscreteEventSchedule::new(),
        )),
    }
}

/// Caller side of a clock driver task
pub struct ClockHandle {
    clock_id: ClockId,
    kind: EngineKind,
    wall: Arc<dyn WallClock>,
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<Snapshot>,
}

impl ClockHandle {
    pub fn spawn<S: TriggerSchedule>(
        config: ClockConfig,
        context: EngineContext,
        schedule: S,
    ) -> Self {
        let clock_id = config.id.clone();
        let kind = schedule.kind();
        let wall = context.wall.clone();
        let pacer = Pacer::start(wall.now(), config.time, config.pace);

        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::new(config.clone(), pacer));
        let (command_tx, command_rx) = mpsc::channel(context.settings.channel_capacity.max(1));

        let driver = ClockDriver::new(config, context, schedule, pacer, snapshot_tx);
        tokio::spawn(driver.run(command_rx));
        debug!("Spawned {} engine for clock {}", kind, clock_id);

        Self {
            clock_id,
            kind,
            wall,
            commands: command_tx,
            snapshot: snapshot_rx,
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> TimeResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| TimeError::EngineStopped(self.clock_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| TimeError::EngineStopped(self.clock_id.clone()))
    }
}

#[async_trait]
impl ClockEngine for ClockHandle {
    fn clock_id(&self) -> &ClockId {
        &self.clock_id
    }

    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn config(&self) -> ClockConfig {
        self.snapshot.borrow().live(self.wall.now())
    }

    async fn start(&self) -> TimeResult<()> {
        self.request(Command::Start).await?
    }

    async fn pause(&self) -> TimeResult<()> {
        self.request(Command::Pause).await?
    }

    async fn set_status(&self, status: ClockStatus) -> TimeResult<()> {
        self.request(|reply| Command::SetStatus(status, reply)).await?
    }

    async fn advance_time_to(&self, time: SimDuration) -> TimeResult<()> {
        self.request(|reply| Command::AdvanceTo(time, reply)).await?
    }

    async fn apply(&self, changes: Vec<ClockChange>) -> TimeResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.request(|reply| Command::Apply(changes, reply)).await?
    }

    async fn set_default_until(&self, until: Option<SimDuration>) -> TimeResult<()> {
        self.request(|reply| Command::SetDefaultUntil(until, reply)).await
    }

    async fn register(
        &self,
        id: TriggerId,
        pattern: String,
        times: FireTimes,
    ) -> TimeResult<Subscription<TriggerEvent>> {
        self.request(|reply| Command::Register {
            id,
            pattern,
            times,
            reply,
        })
        .await
    }

    async fn unregister(&self, id: TriggerId) -> TimeResult<bool> {
        self.request(|reply| Command::Unregister(id, reply)).await
    }

    async fn observe(&self) -> TimeResult<Subscription<ClockEvent>> {
        self.request(Command::Observe).await
    }

    async fn triggers(&self) -> TimeResult<Vec<TriggerStatus>> {
        self.request(Command::Triggers).await
    }

    async fn shutdown(&self) {
        if self.request(Command::Shutdown).await.is_err() {
            warn!("Engine for clock {} already stopped", self.clock_id);
        }
    }
}

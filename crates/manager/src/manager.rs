use chrono::FixedOffset;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tempora_clock::SystemClock;
use tempora_core::{
    ClockChange, ClockConfig, ClockEvent, ClockId, ClockStatus, SimDuration, SimInstant,
    TimerConfig, TriggerConfig, TriggerEvent, TriggerId,
};
use tempora_engine::{ClockEngine, EngineContext, FireTimes, Subscription, spawn_engine};
use tempora_pattern::RecurrencePattern;
use tempora_ports::{TimeError, TimeResult, WallClock};
use tokio::sync::{Mutex, RwLock};

use crate::settings::ManagerSettings;
use crate::status::{ClockStatusReport, TimerStatus};

/// The timer config in force and the epoch it resolved to
struct TimerState {
    config: TimerConfig,
    epoch: SimInstant,
}

impl TimerState {
    fn new(config: TimerConfig, wall: &dyn WallClock) -> Self {
        let epoch = config.offset.unwrap_or_else(|| wall.timestamp());
        Self { config, epoch }
    }
}

/// One registered clock
struct ClockEntry {
    engine: Arc<dyn ClockEngine>,
    /// Epoch the engine was created with; fire times are relative to it
    epoch: SimInstant,
    /// Serializes diff-and-apply for this clock id
    updates: Mutex<()>,
}

/// A trigger as filed in the index
struct TriggerFiling {
    config: TriggerConfig,
    /// Tells a re-registration of the same id apart from this one
    filed: u64,
}

/// Registry of the clocks and triggers of one timer run
///
/// Clocks live in a `DashMap`, so callers working on different clock ids
/// never block each other, while updates to the same id queue on that
/// clock's update lock. Each clock's state belongs to its engine's driver
/// task; the manager only sends it requests.
pub struct TimeManager {
    settings: ManagerSettings,
    zone: FixedOffset,
    wall: Arc<dyn WallClock>,
    timer: RwLock<TimerState>,
    clocks: DashMap<ClockId, Arc<ClockEntry>>,
    /// Trigger index, with the clock each trigger was resolved to
    triggers: DashMap<TriggerId, TriggerFiling>,
    filings: AtomicU64,
}

impl TimeManager {
    /// Create a manager; clocks are spawned on first use
    pub fn new(settings: ManagerSettings, wall: Arc<dyn WallClock>) -> Self {
        let timer = TimerState::new(settings.timer.clone(), wall.as_ref());
        info!(
            "Time manager for timer {} created (epoch {}, {} engines)",
            timer.config.id, timer.epoch, settings.engine.kind
        );
        Self {
            zone: settings.zone(),
            settings,
            wall,
            timer: RwLock::new(timer),
            clocks: DashMap::new(),
            triggers: DashMap::new(),
            filings: AtomicU64::new(0),
        }
    }

    /// Create a manager driven by the system clock
    pub fn with_settings(settings: ManagerSettings) -> Self {
        Self::new(settings, Arc::new(SystemClock::new()))
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Engine of a live clock
    pub fn clock(&self, id: &ClockId) -> Option<Arc<dyn ClockEngine>> {
        self.entry(id).map(|entry| Arc::clone(&entry.engine))
    }

    /// Trigger as filed, with the clock it was resolved to
    ///
    /// A trigger whose registration ended on its own stays listed until the
    /// next [`prune_triggers`](Self::prune_triggers).
    pub fn trigger(&self, id: &TriggerId) -> Option<TriggerConfig> {
        self.triggers.get(id).map(|entry| entry.value().config.clone())
    }

    /// Drop triggers whose registration is gone from its clock
    ///
    /// A registration ends without `remove_trigger` when its sequence runs
    /// out or its clock reaches a terminal status. Returns how many triggers
    /// were dropped.
    pub async fn prune_triggers(&self) -> usize {
        let indexed: Vec<(TriggerId, u64)> = self
            .triggers
            .iter()
            .map(|entry| (*entry.key(), entry.value().filed))
            .collect();
        if indexed.is_empty() {
            return 0;
        }

        let mut live = HashSet::new();
        for entry in self.entries() {
            if let Ok(triggers) = entry.engine.triggers().await {
                live.extend(triggers.into_iter().map(|trigger| trigger.id));
            }
        }

        let mut pruned = 0;
        for (id, filed) in indexed {
            if live.contains(&id) {
                continue;
            }
            // Only the filing seen above; a re-registration since then stays
            if self
                .triggers
                .remove_if(&id, |_, filing| filing.filed == filed)
                .is_some()
            {
                debug!("Trigger {} ended, dropped from the index", id);
                pruned += 1;
            }
        }
        pruned
    }

    // ---- Timer ----

    /// Replace the timer config as a whole
    ///
    /// Live clocks pick up the new duration as their default bound, and
    /// every clock the config lists is created or updated to match it.
    pub async fn set_timer_config(&self, config: TimerConfig) -> TimeResult<()> {
        {
            let mut timer = self.timer.write().await;
            *timer = TimerState::new(config.clone(), self.wall.as_ref());
            info!("Timer config {} applied (epoch {})", config.id, timer.epoch);
        }

        for entry in self.entries() {
            entry.engine.set_default_until(config.duration).await?;
        }
        for clock in config.clocks.into_values() {
            self.update_clock(clock).await?;
        }
        Ok(())
    }

    /// Timer config in force, listing every live clock as it is now
    pub async fn get_timer_config(&self) -> TimerConfig {
        let mut config = self.timer.read().await.config.clone();
        for entry in self.entries() {
            let clock = entry.engine.config();
            config.clocks.insert(clock.id.clone(), clock);
        }
        config
    }

    pub async fn get_timer_status(&self) -> TimerStatus {
        self.prune_triggers().await;
        let epoch = self.timer.read().await.epoch;
        let timer = self.get_timer_config().await;

        let mut clocks = Vec::new();
        for entry in self.entries() {
            let triggers = match entry.engine.triggers().await {
                Ok(triggers) => triggers,
                Err(e) => {
                    debug!("No trigger report for clock {}: {}", entry.engine.clock_id(), e);
                    Vec::new()
                }
            };
            clocks.push(ClockStatusReport {
                config: entry.engine.config(),
                engine: entry.engine.kind(),
                triggers,
            });
        }
        clocks.sort_by(|a, b| a.config.id.cmp(&b.config.id));

        TimerStatus {
            timer,
            epoch,
            clocks,
        }
    }

    /// Remove every clock, and with them every trigger
    pub async fn destroy(&self) {
        let ids: Vec<ClockId> = self.clocks.iter().map(|entry| entry.key().clone()).collect();
        for id in &ids {
            self.teardown(id).await;
        }
        self.triggers.clear();
        info!("Time manager destroyed {} clocks", ids.len());
    }

    // ---- Clocks ----

    /// Config of `id`, or of the root clock when `id` is `None`
    ///
    /// The root clock and clocks listed in the timer config are created on
    /// first use; any other unknown id is an error.
    pub async fn get_clock(&self, id: Option<&ClockId>) -> TimeResult<ClockConfig> {
        let id = match id {
            Some(id) => id.clone(),
            None => self.root_id().await,
        };
        if let Some(entry) = self.entry(&id) {
            return Ok(entry.engine.config());
        }
        match self.seed(&id).await {
            Some(seed) => Ok(self.materialize(seed).await.0.engine.config()),
            None => Err(TimeError::UnknownClock(id)),
        }
    }

    /// Create the clock, or apply whatever differs from its live config
    pub async fn update_clock(&self, desired: ClockConfig) -> TimeResult<ClockConfig> {
        let (entry, created) = self.materialize(desired.clone()).await;
        if created {
            return Ok(entry.engine.config());
        }

        let _guard = entry.updates.lock().await;
        let current = entry.engine.config();
        let mut changes = current.diff(&desired);

        // A paced running clock moves on its own, so a config read a moment
        // ago already carries an older time
        let moving = current.status == ClockStatus::Running
            && current.pace.is_some_and(|pace| !pace.is_unconstrained());
        changes.retain(|change| match change {
            ClockChange::Time(time) if moving && *time < current.time => {
                debug!(
                    "Clock {} is at {}, dropping stale time {}",
                    current.id, current.time, time
                );
                false
            }
            _ => true,
        });

        if changes.is_empty() {
            debug!("Clock {} unchanged", current.id);
        } else {
            entry.engine.apply(changes).await?;
        }
        Ok(entry.engine.config())
    }

    /// Remove a clock together with every clock forked from it
    ///
    /// Removing a clock that does not exist is a no-op.
    pub async fn remove_clock(&self, id: &ClockId) -> TimeResult<()> {
        if *id == self.root_id().await {
            return Err(TimeError::CannotRemoveRoot(id.clone()));
        }
        if !self.clocks.contains_key(id) {
            debug!("Clock {} already removed", id);
            return Ok(());
        }
        for clock_id in self.subtree(id) {
            self.teardown(&clock_id).await;
        }
        Ok(())
    }

    /// Create `child` as a fork of `parent` at the parent's current time
    ///
    /// The child copies the parent's pace and bounds and then runs on its
    /// own. Forking onto an existing id returns that clock unchanged.
    pub async fn fork_clock(&self, parent: &ClockId, child: &ClockId) -> TimeResult<ClockConfig> {
        let parent_config = self.get_clock(Some(parent)).await?;
        if let Some(existing) = self.entry(child) {
            warn!("Clock {} already exists, not forking it from {}", child, parent);
            return Ok(existing.engine.config());
        }

        let mut config =
            ClockConfig::new(child.clone()).forked_from(parent.clone(), parent_config.time);
        config.pace = parent_config.pace;
        config.until = parent_config.until;
        config.slave_timeout = parent_config.slave_timeout;

        let (entry, _) = self.materialize(config).await;
        info!("Clock {} forked from {} at {}", child, parent, parent_config.time);
        Ok(entry.engine.config())
    }

    /// Stream of the clock's events, creating the clock if needed
    pub async fn observe_clock(&self, id: &ClockId) -> TimeResult<Subscription<ClockEvent>> {
        let entry = match self.entry(id) {
            Some(entry) => entry,
            None => {
                warn!("Clock {} observed before it was created, creating it", id);
                let seed = self
                    .seed(id)
                    .await
                    .unwrap_or_else(|| ClockConfig::new(id.clone()));
                self.materialize(seed).await.0
            }
        };
        entry.engine.observe().await
    }

    // ---- Triggers ----

    /// Schedule a pattern on its clock and stream its fires
    ///
    /// The pattern is parsed before anything else, so a bad pattern fails
    /// the call. A clock that cannot be found yields a stream that is
    /// already complete.
    pub async fn register_trigger(
        &self,
        trigger: TriggerConfig,
    ) -> TimeResult<Subscription<TriggerEvent>> {
        let pattern = RecurrencePattern::parse(&trigger.pattern)?;
        self.prune_triggers().await;
        let clock_id = match &trigger.clock_id {
            Some(id) => id.clone(),
            None => self.root_id().await,
        };

        let entry = match self.entry(&clock_id) {
            Some(entry) => entry,
            None => match self.seed(&clock_id).await {
                Some(seed) => self.materialize(seed).await.0,
                None => {
                    warn!(
                        "Clock {} not found, trigger {} gets an empty stream",
                        clock_id, trigger.id
                    );
                    return Ok(Subscription::closed());
                }
            },
        };

        let times = self.fire_times(&pattern, &entry).await?;
        match entry
            .engine
            .register(trigger.id, trigger.pattern.clone(), times)
            .await
        {
            Ok(subscription) => {
                debug!("Trigger {} '{}' on clock {}", trigger.id, pattern, clock_id);
                self.triggers.insert(
                    trigger.id,
                    TriggerFiling {
                        config: TriggerConfig {
                            clock_id: Some(clock_id),
                            ..trigger
                        },
                        filed: self.filings.fetch_add(1, Ordering::Relaxed),
                    },
                );
                Ok(subscription)
            }
            Err(TimeError::EngineStopped(id)) => {
                warn!("Clock {} was removed, trigger {} gets an empty stream", id, trigger.id);
                Ok(Subscription::closed())
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the pattern (and optionally the clock) of a trigger
    ///
    /// A new pattern that fails to parse leaves the old registration in place.
    pub async fn update_trigger(
        &self,
        trigger: TriggerConfig,
    ) -> TimeResult<Subscription<TriggerEvent>> {
        let existing = self
            .trigger(&trigger.id)
            .ok_or(TimeError::UnknownTrigger(trigger.id))?;
        RecurrencePattern::parse(&trigger.pattern)?;

        let clock_id = trigger.clock_id.clone().or(existing.clock_id);
        self.remove_trigger(&trigger.id).await?;
        self.register_trigger(TriggerConfig { clock_id, ..trigger })
            .await
    }

    /// Unschedule a trigger; removing an unknown trigger is a no-op
    pub async fn remove_trigger(&self, id: &TriggerId) -> TimeResult<()> {
        let Some((_, TriggerFiling { config: trigger, .. })) = self.triggers.remove(id) else {
            debug!("Trigger {} already removed", id);
            return Ok(());
        };

        let engine = trigger.clock_id.as_ref().and_then(|clock_id| self.clock(clock_id));
        if let Some(engine) = engine {
            match engine.unregister(*id).await {
                Ok(_) => debug!("Trigger {} removed from clock {}", id, engine.clock_id()),
                Err(e) => debug!("Trigger {} left with its clock: {}", id, e),
            }
        }
        Ok(())
    }

    // ---- Internals ----

    fn entry(&self, id: &ClockId) -> Option<Arc<ClockEntry>> {
        self.clocks.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn entries(&self) -> Vec<Arc<ClockEntry>> {
        self.clocks
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    async fn root_id(&self) -> ClockId {
        self.timer.read().await.config.root_clock_id.clone()
    }

    /// Seed config for a clock the timer knows about: the root or a listed clock
    async fn seed(&self, id: &ClockId) -> Option<ClockConfig> {
        let timer = self.timer.read().await;
        if *id == timer.config.root_clock_id {
            return Some(timer.config.root_clock());
        }
        timer.config.clocks.get(id).cloned()
    }

    async fn context(&self) -> EngineContext {
        let timer = self.timer.read().await;
        EngineContext {
            epoch: timer.epoch,
            default_until: timer.config.duration,
            wall: Arc::clone(&self.wall),
            settings: self.settings.engine.clone(),
        }
    }

    /// Get the clock `config.id`, spawning it from `config` if it is new
    ///
    /// The flag is true when this call created the clock.
    async fn materialize(&self, config: ClockConfig) -> (Arc<ClockEntry>, bool) {
        // Fast path: already live
        if let Some(entry) = self.entry(&config.id) {
            return (entry, false);
        }

        // Slow path: the entry lock decides which concurrent caller spawns it
        let context = self.context().await;
        let mut created = false;
        let entry = self
            .clocks
            .entry(config.id.clone())
            .or_insert_with(|| {
                created = true;
                info!("Creating clock {} ({})", config.id, config.status);
                let epoch = context.epoch;
                Arc::new(ClockEntry {
                    engine: spawn_engine(config, context),
                    epoch,
                    updates: Mutex::new(()),
                })
            })
            .clone();
        (entry, created)
    }

    /// Clock-relative fire times of `pattern`, starting at the clock's time
    async fn fire_times(
        &self,
        pattern: &RecurrencePattern,
        entry: &ClockEntry,
    ) -> TimeResult<FireTimes> {
        let timer = self.timer.read().await.config.clone();
        let epoch = entry.epoch;
        let start = entry.engine.config().time.after(epoch);
        let instants = pattern.evaluate(start, self.zone)?;
        Ok(Box::new(instants.map(move |instant| {
            timer.quantize(SimDuration::between(epoch, instant))
        })))
    }

    /// `id` and every clock forked from it, directly or not, leaves first
    fn subtree(&self, id: &ClockId) -> Vec<ClockId> {
        let forks: Vec<(ClockId, Option<ClockId>)> = self
            .entries()
            .iter()
            .map(|entry| {
                let config = entry.engine.config();
                (config.id, config.fork_parent_id)
            })
            .collect();

        let mut members = vec![id.clone()];
        let mut seen: HashSet<ClockId> = HashSet::from([id.clone()]);
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(parent) = queue.pop_front() {
            for (child, fork_parent) in &forks {
                if fork_parent.as_ref() == Some(&parent) && seen.insert(child.clone()) {
                    members.push(child.clone());
                    queue.push_back(child.clone());
                }
            }
        }
        members.reverse();
        members
    }

    async fn teardown(&self, id: &ClockId) {
        let Some((_, entry)) = self.clocks.remove(id) else {
            return;
        };
        self.triggers
            .retain(|_, filing| filing.config.clock_id.as_ref() != Some(id));
        entry.engine.shutdown().await;
        info!("Removed clock {}", id);
    }
}

//! Engine Lifecycle Integration Test
//!
//! Drives both engine strategies through their public contract on a paused
//! tokio runtime, so pacing deadlines are observed exactly.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempora_clock::SystemClock;
use tempora_core::{ClockChange, ClockConfig, ClockStatus, Rate, SimDuration, TriggerEvent};
use tempora_engine::{
    ClockEngine, EngineContext, EngineKind, EngineSettings, FireTimes, Subscription,
    spawn_engine,
};
use tempora_ports::TimeError;
use tokio::time::Instant;
use uuid::Uuid;

const KINDS: [EngineKind; 2] = [EngineKind::Reactive, EngineKind::DiscreteEvent];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn context(kind: EngineKind) -> EngineContext {
    EngineContext {
        epoch: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        default_until: None,
        wall: Arc::new(SystemClock::new()),
        settings: EngineSettings {
            kind,
            ..EngineSettings::default()
        },
    }
}

fn ms(millis: i64) -> SimDuration {
    SimDuration::from_millis(millis)
}

/// Fire times `first, first + step, ...` without end
fn every(first: SimDuration, step: SimDuration) -> FireTimes {
    Box::new(
        (0i64..).map(move |i| SimDuration::from_nanos(first.as_nanos() + step.as_nanos() * i)),
    )
}

fn at(times: &[SimDuration]) -> FireTimes {
    Box::new(times.to_vec().into_iter())
}

async fn register(
    engine: &Arc<dyn ClockEngine>,
    times: FireTimes,
) -> Subscription<TriggerEvent> {
    engine
        .register(Uuid::new_v4(), "test".to_string(), times)
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_status_lifecycle() {
    init_logger();
    for kind in KINDS {
        let engine = spawn_engine(ClockConfig::new("a").with_until(ms(100)), context(kind));
        assert_eq!(engine.kind(), kind);
        assert_eq!(engine.config().status, ClockStatus::Waiting);

        engine.start().await.unwrap();
        engine.advance_time_to(ms(50)).await.unwrap();
        let config = engine.config();
        assert_eq!(config.status, ClockStatus::Running);
        assert_eq!(config.time, ms(50));

        engine.advance_time_to(ms(100)).await.unwrap();
        assert_eq!(engine.config().status, ClockStatus::Completed);

        // Terminal: further requests are no-ops
        engine.start().await.unwrap();
        assert_eq!(engine.config().status, ClockStatus::Completed);
        assert_eq!(engine.config().time, ms(100));

        engine.shutdown().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_time_never_moves_backwards() {
    init_logger();
    for kind in KINDS {
        let engine = spawn_engine(ClockConfig::new("a"), context(kind));
        let mut events = engine.observe().await.unwrap();
        engine.start().await.unwrap();

        engine.advance_time_to(ms(50)).await.unwrap();
        engine.advance_time_to(ms(50)).await.unwrap();
        let err = engine.advance_time_to(ms(20)).await.unwrap_err();
        assert_eq!(
            err,
            TimeError::InvalidTimeTravel {
                clock_id: "a".into(),
                current: ms(50),
                requested: ms(20),
            }
        );
        assert_eq!(engine.config().status, ClockStatus::Failed);
        assert_eq!(engine.config().time, ms(50));

        let mut last_time = SimDuration::ZERO;
        let mut statuses = Vec::new();
        while let Some(event) = events.next_event().await {
            assert!(event.time >= last_time);
            last_time = event.time;
            statuses.push(event.status);
        }
        assert_eq!(statuses.first(), Some(&ClockStatus::Running));
        assert_eq!(statuses.last(), Some(&ClockStatus::Failed));
    }
}

#[tokio::test(start_paused = true)]
async fn test_advance_requires_running() {
    init_logger();
    let engine = spawn_engine(ClockConfig::new("a"), context(EngineKind::Reactive));

    let err = engine.advance_time_to(ms(10)).await.unwrap_err();
    assert!(matches!(err, TimeError::NotRunning { status: ClockStatus::Waiting, .. }));
    assert_eq!(engine.config().status, ClockStatus::Waiting);
}

#[tokio::test(start_paused = true)]
async fn test_unconstrained_clock_fires_until_bound() {
    init_logger();
    for kind in KINDS {
        let engine = spawn_engine(
            ClockConfig::new("a").with_until(SimDuration::from_secs(65)),
            context(kind),
        );
        let trigger = register(&engine, every(SimDuration::ZERO, SimDuration::from_secs(20))).await;
        engine.start().await.unwrap();

        let fired = trigger.collect_events().await;
        let times: Vec<_> = fired.iter().map(|e| e.time).collect();
        assert_eq!(
            times,
            vec![
                SimDuration::ZERO,
                SimDuration::from_secs(20),
                SimDuration::from_secs(40),
                SimDuration::from_secs(60),
            ]
        );
        let flags: Vec<_> = fired.iter().map(|e| e.is_last).collect();
        assert_eq!(flags, vec![false, false, false, true]);

        let config = engine.config();
        assert_eq!(config.status, ClockStatus::Completed);
        assert_eq!(config.time, SimDuration::from_secs(65));
    }
}

#[tokio::test(start_paused = true)]
async fn test_subscriber_reading_after_completion_gets_every_fire() {
    init_logger();
    for kind in KINDS {
        let engine = spawn_engine(
            ClockConfig::new("a").with_until(SimDuration::from_secs(3000)),
            context(kind),
        );
        let trigger = register(&engine, every(SimDuration::ZERO, SimDuration::from_secs(1))).await;
        let clock_events = engine.observe().await.unwrap();
        engine.start().await.unwrap();

        // Nothing reads the trigger until the clock is done
        let updates = clock_events.collect_events().await;
        assert_eq!(
            updates.last().map(|e| e.status),
            Some(ClockStatus::Completed)
        );

        let fired = trigger.collect_events().await;
        assert_eq!(fired.len(), 3001, "{kind} engine");
        assert_eq!(fired[0].time, SimDuration::ZERO);
        assert_eq!(fired[3000].time, SimDuration::from_secs(3000));
        assert_eq!(fired.iter().filter(|e| e.is_last).count(), 1);
        assert!(fired[3000].is_last);
    }
}

#[tokio::test(start_paused = true)]
async fn test_advance_fires_every_due_instant_once() {
    init_logger();
    for kind in KINDS {
        // Slow enough that nothing comes due on its own between requests
        let engine = spawn_engine(ClockConfig::new("a").with_pace(1000.0), context(kind));
        let trigger = register(&engine, at(&[ms(10), ms(10), ms(30), ms(70)])).await;
        engine.start().await.unwrap();

        engine.advance_time_to(ms(40)).await.unwrap();
        let status = engine.triggers().await.unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].delivered, 2);
        assert_eq!(status[0].next_fire, Some(ms(70)));

        engine.advance_time_to(ms(100)).await.unwrap();
        let times: Vec<_> = trigger.collect_events().await.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![ms(10), ms(30), ms(70)]);
        assert!(engine.triggers().await.unwrap().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn test_paced_trigger_fires_at_wall_deadline() {
    init_logger();
    for (pace, expected_wall) in [(1.0, 100), (0.5, 50), (2.0, 200)] {
        let engine = spawn_engine(
            ClockConfig::new("a").with_pace(pace),
            context(EngineKind::Reactive),
        );
        let mut trigger = register(&engine, at(&[ms(100)])).await;

        let w0 = Instant::now();
        engine.start().await.unwrap();
        let event = trigger.next_event().await.unwrap();
        let elapsed = Instant::now() - w0;

        assert_eq!(event.time, ms(100));
        assert!(event.is_last);
        assert!(elapsed >= Duration::from_millis(expected_wall));
        assert!(elapsed < Duration::from_millis(expected_wall + 5));
        assert!(trigger.next_event().await.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn test_pause_halts_firing_and_resume_continues() {
    init_logger();
    let engine = spawn_engine(
        ClockConfig::new("a").with_pace(Rate::REAL_TIME),
        context(EngineKind::DiscreteEvent),
    );
    let mut trigger = register(&engine, every(ms(100), ms(100))).await;
    engine.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    engine.pause().await.unwrap();
    let config = engine.config();
    assert_eq!(config.status, ClockStatus::Waiting);
    assert_eq!(config.time, ms(250));

    assert_eq!(trigger.next_event().await.unwrap().time, ms(100));
    assert_eq!(trigger.next_event().await.unwrap().time, ms(200));
    let idle = tokio::time::timeout(Duration::from_secs(1), trigger.next_event()).await;
    assert!(idle.is_err());

    let resumed = Instant::now();
    engine.start().await.unwrap();
    assert_eq!(trigger.next_event().await.unwrap().time, ms(300));
    let waited = Instant::now() - resumed;
    assert!(waited >= Duration::from_millis(50));
    assert!(waited < Duration::from_millis(55));
}

#[tokio::test(start_paused = true)]
async fn test_pace_change_rebases_deadlines() {
    init_logger();
    let engine = spawn_engine(
        ClockConfig::new("a").with_pace(Rate::REAL_TIME),
        context(EngineKind::Reactive),
    );
    let mut trigger = register(&engine, at(&[ms(200)])).await;

    let w0 = Instant::now();
    engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine
        .apply(vec![ClockChange::Pace(Some(Rate::new(0.5)))])
        .await
        .unwrap();
    assert_eq!(engine.config().time, ms(100));

    trigger.next_event().await.unwrap();
    let elapsed = Instant::now() - w0;
    assert!(elapsed >= Duration::from_millis(150));
    assert!(elapsed < Duration::from_millis(155));
}

#[tokio::test(start_paused = true)]
async fn test_paced_clock_reports_live_time() {
    init_logger();
    let engine = spawn_engine(
        ClockConfig::new("a").with_pace(Rate::REAL_TIME).with_until(ms(500)),
        context(EngineKind::Reactive),
    );
    let mut events = engine.observe().await.unwrap();
    engine.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.config().time, ms(300));
    assert_eq!(engine.config().status, ClockStatus::Running);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let config = engine.config();
    assert_eq!(config.status, ClockStatus::Completed);
    assert_eq!(config.time, ms(500));

    let mut last = None;
    while let Some(event) = events.next_event().await {
        last = Some(event);
    }
    let last = last.unwrap();
    assert_eq!(last.status, ClockStatus::Completed);
    assert_eq!(last.time, ms(500));
}

#[tokio::test(start_paused = true)]
async fn test_seeded_running_clock_starts_itself() {
    init_logger();
    let engine = spawn_engine(
        ClockConfig::new("a")
            .with_status(ClockStatus::Running)
            .with_time(ms(40))
            .with_until(ms(60)),
        context(EngineKind::Reactive),
    );
    let trigger = register(&engine, at(&[ms(10), ms(50)])).await;

    let fired: Vec<_> = trigger.collect_events().await.iter().map(|e| e.time).collect();
    // The past instant fires at the current time, never before it
    assert_eq!(fired, vec![ms(40), ms(50)]);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_sequence_only_fails_its_registration() {
    init_logger();
    let engine = spawn_engine(ClockConfig::new("a"), context(EngineKind::Reactive));
    let mut bad = register(&engine, at(&[ms(10), ms(5)])).await;
    let good = register(&engine, at(&[ms(10)])).await;

    assert!(matches!(bad.recv().await, Some(Err(TimeError::PatternParse { .. }))));
    assert!(bad.recv().await.is_none());

    engine.start().await.unwrap();
    engine.advance_time_to(ms(20)).await.unwrap();
    assert_eq!(good.collect_events().await.len(), 1);
    assert_eq!(engine.config().status, ClockStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn test_unregister_is_idempotent() {
    init_logger();
    let engine = spawn_engine(ClockConfig::new("a"), context(EngineKind::DiscreteEvent));
    let id = Uuid::new_v4();
    let trigger = engine
        .register(id, "test".to_string(), every(ms(10), ms(10)))
        .await
        .unwrap();

    assert!(engine.unregister(id).await.unwrap());
    assert!(!engine.unregister(id).await.unwrap());
    assert!(trigger.collect_events().await.is_empty());

    engine.start().await.unwrap();
    engine.advance_time_to(ms(100)).await.unwrap();
    assert!(engine.triggers().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_terminal_clock_hands_out_closed_streams() {
    init_logger();
    let engine = spawn_engine(ClockConfig::new("a"), context(EngineKind::Reactive));
    engine.set_status(ClockStatus::Completed).await.unwrap();

    assert!(engine.observe().await.unwrap().is_closed());
    let trigger = register(&engine, at(&[ms(1)])).await;
    assert!(trigger.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_completes_streams() {
    init_logger();
    let engine = spawn_engine(ClockConfig::new("a"), context(EngineKind::Reactive));
    let events = engine.observe().await.unwrap();
    let trigger = register(&engine, every(ms(1), ms(1))).await;

    engine.shutdown().await;
    assert!(events.collect_events().await.is_empty());
    assert!(trigger.collect_events().await.is_empty());

    // Second shutdown and later requests see a stopped engine
    engine.shutdown().await;
    assert_eq!(
        engine.start().await.unwrap_err(),
        TimeError::EngineStopped("a".into())
    );
}

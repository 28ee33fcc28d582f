//! Integration tests for the full work/break cycle.
//!
//! These drive the service through whole days of intervals and verify the
//! long-break cadence, the recorded history, and the aggregate stats.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tomata_core::{
    Config, Event, HistoryStore, NullNotifier, Phase, PomodoroService, TimerEngine,
};

fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
}

fn service() -> PomodoroService {
    let store = HistoryStore::open_memory().unwrap();
    PomodoroService::new(Config::default(), store, Box::new(NullNotifier), morning()).unwrap()
}

/// Run one interval to completion, returning the completion event.
fn run_interval(svc: &mut PomodoroService, start: DateTime<Utc>) -> (Event, DateTime<Utc>) {
    svc.start(start);
    let total = svc.engine().session_total_secs() as i64;
    let end = start + Duration::seconds(total);
    let event = svc
        .tick(end)
        .unwrap()
        .unwrap_or_else(|| panic!("interval should complete at {}", end));
    (event, end)
}

#[test]
fn test_four_work_intervals_earn_a_long_break() {
    let mut svc = service();
    let mut now = morning();

    for round in 1..=4u32 {
        // Work interval.
        assert_eq!(svc.engine().phase(), Phase::Work);
        let (event, end) = run_interval(&mut svc, now);
        match event {
            Event::PhaseCompleted {
                next_phase,
                next_total_secs,
                long_break,
                ..
            } => {
                assert_eq!(next_phase, Phase::Break);
                assert_eq!(long_break, round == 4);
                // 15 min long break on the fourth, 5 min otherwise.
                assert_eq!(next_total_secs, if round == 4 { 900 } else { 300 });
            }
            other => panic!("unexpected event {:?}", other),
        }

        // Break interval.
        let (event, end) = run_interval(&mut svc, end);
        assert!(matches!(
            event,
            Event::PhaseCompleted { next_phase: Phase::Work, .. }
        ));
        now = end;
    }

    assert_eq!(svc.engine().completed_work(), 4);

    // Only work intervals count as completed sessions; breaks are recorded
    // but flagged incomplete.
    let sessions = svc.recorder().store().all_sessions().unwrap();
    assert_eq!(sessions.len(), 8);
    assert_eq!(sessions.iter().filter(|s| s.is_completed).count(), 4);

    let stats = svc.recorder().store().load_stats();
    assert_eq!(stats.total_completed, 4);
    assert_eq!(stats.total_work_secs, 4 * 1500);
    assert_eq!(stats.most_productive_day, Some(morning().date_naive()));
}

#[test]
fn test_pause_stretches_the_interval_by_wall_clock() {
    let mut svc = service();
    let start = morning();
    svc.start(start);

    // 10 minutes in, pause for an hour over lunch.
    svc.pause(start + Duration::minutes(10));
    assert!(svc.tick(start + Duration::minutes(40)).unwrap().is_none());
    svc.start(start + Duration::minutes(70));

    // 15 minutes of running time remain.
    let not_yet = start + Duration::minutes(70) + Duration::seconds(899);
    assert!(svc.tick(not_yet).unwrap().is_none());

    let done = start + Duration::minutes(85);
    let event = svc.tick(done).unwrap();
    assert!(matches!(event, Some(Event::PhaseCompleted { .. })));

    // The recorded duration is the configured interval length, not the
    // stretched wall-clock span.
    let sessions = svc.recorder().store().all_sessions().unwrap();
    assert_eq!(sessions[0].duration_secs, 1500);
    assert_eq!(sessions[0].ended_at, done);
}

#[test]
fn test_engine_state_survives_a_restart() {
    let store = HistoryStore::open_memory().unwrap();
    let config = Config::default();
    let start = morning();

    let mut engine = TimerEngine::new(&config);
    engine.start(start);
    engine.pause(start + Duration::seconds(600));
    let saved = serde_json::to_string(&engine).unwrap();
    store
        .kv_set(tomata_core::storage::history::ENGINE_KEY, &saved)
        .unwrap();

    // "Restart": rebuild the service over the same store and restore.
    let mut svc =
        PomodoroService::new(config, store, Box::new(NullNotifier), start).unwrap();
    let raw = svc
        .recorder()
        .store()
        .kv_get(tomata_core::storage::history::ENGINE_KEY)
        .unwrap()
        .unwrap();
    let restored: TimerEngine = serde_json::from_str(&raw).unwrap();
    svc.restore_engine(restored);

    let later = start + Duration::hours(2);
    assert!(!svc.engine().is_running());
    assert_eq!(svc.engine().remaining_secs(later), 900);
}

#[test]
fn test_config_change_mid_run_applies_next_interval() {
    let mut svc = service();
    let start = morning();
    svc.start(start);

    let mut updated = svc.config().clone();
    updated.timer.work_min = 10.0;
    let event = svc.apply_config(updated, start + Duration::seconds(60));
    assert!(matches!(event, Some(Event::ConfigDeferred { .. })));
    assert!(svc.display(start + Duration::seconds(61)).advisory_visible);
    assert!(!svc.display(start + Duration::seconds(64)).advisory_visible);

    // Current interval still runs its original 25 minutes.
    let done = start + Duration::seconds(1500);
    assert!(matches!(
        svc.tick(done).unwrap(),
        Some(Event::PhaseCompleted { .. })
    ));

    // After the break, the next work interval uses the new duration.
    let (_, end) = {
        svc.start(done);
        let total = svc.engine().session_total_secs() as i64;
        let end = done + Duration::seconds(total);
        (svc.tick(end).unwrap(), end)
    };
    svc.start(end);
    assert_eq!(svc.engine().session_total_secs(), 600);
}

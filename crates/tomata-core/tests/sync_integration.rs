//! Integration tests for cloud sync over the full stack: local store,
//! recorder, and reconciler against an in-memory remote.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use tomata_core::{
    EventBus, HistoryStore, RemoteStore, Session, SessionRecorder, SyncEngine, SyncError,
    SyncOutcome,
};
use uuid::Uuid;

struct MemoryRemote {
    sessions: Mutex<Vec<Session>>,
}

impl MemoryRemote {
    fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Mutex::new(sessions),
        }
    }

    fn ids(&self) -> HashSet<Uuid> {
        self.sessions.lock().unwrap().iter().map(|s| s.id).collect()
    }
}

impl RemoteStore for MemoryRemote {
    fn fetch_all(&self) -> Result<Vec<Session>, SyncError> {
        Ok(self.sessions.lock().unwrap().clone())
    }

    fn upsert(&self, sessions: &[Session]) -> Result<(), SyncError> {
        let mut held = self.sessions.lock().unwrap();
        for session in sessions {
            held.retain(|s| s.id != session.id);
            held.push(session.clone());
        }
        Ok(())
    }

    fn delete(&self, ids: &[Uuid]) -> Result<(), SyncError> {
        self.sessions.lock().unwrap().retain(|s| !ids.contains(&s.id));
        Ok(())
    }
}

fn session_on(day: u32, hour: u32) -> Session {
    let started = Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap();
    Session {
        id: Uuid::new_v4(),
        started_at: started,
        ended_at: started + Duration::seconds(1500),
        duration_secs: 1500,
        is_completed: true,
    }
}

fn recorder_with(sessions: &[Session]) -> SessionRecorder {
    let store = HistoryStore::open_memory().unwrap();
    let recorder = SessionRecorder::new(store, Arc::new(EventBus::new()));
    for session in sessions {
        recorder.record_session(session).unwrap();
    }
    recorder
}

#[test]
fn test_both_stores_converge_on_the_union() {
    // Local knows {a, b}, remote knows {b, c}.
    let a = session_on(3, 9);
    let b = session_on(3, 10);
    let c = session_on(4, 9);

    let recorder = recorder_with(&[a.clone(), b.clone()]);
    let remote = MemoryRemote::new(vec![b.clone(), c.clone()]);
    let engine = SyncEngine::new(remote, Arc::new(EventBus::new()), None);

    let outcome = engine.sync(&recorder).unwrap();
    assert_eq!(outcome, SyncOutcome { pulled: 1, pushed: 1 });

    let expected: HashSet<Uuid> = [a.id, b.id, c.id].into_iter().collect();
    let local: HashSet<Uuid> = recorder
        .store()
        .session_ids()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(local, expected);

    // Stats reflect the merged history.
    let stats = recorder.store().load_stats();
    assert_eq!(stats.total_completed, 3);
    assert_eq!(stats.most_productive_day, Some(a.started_at.date_naive()));
    assert_eq!(stats.last_synced, engine.status().last_synced);
}

#[test]
fn test_second_sync_is_a_no_op() {
    let a = session_on(3, 9);
    let recorder = recorder_with(&[a.clone()]);
    let engine = SyncEngine::new(
        MemoryRemote::new(vec![session_on(4, 9)]),
        Arc::new(EventBus::new()),
        None,
    );

    let first = engine.sync(&recorder).unwrap();
    assert_eq!(first, SyncOutcome { pulled: 1, pushed: 1 });

    let second = engine.sync(&recorder).unwrap();
    assert_eq!(second, SyncOutcome::default());
}

#[test]
fn test_remote_only_history_restores_a_fresh_device() {
    // New install with an empty local store pulls the whole backup.
    let backup: Vec<Session> = (0..5).map(|i| session_on(3 + i, 9)).collect();
    let recorder = recorder_with(&[]);
    let remote = MemoryRemote::new(backup.clone());
    let expected = remote.ids();
    let engine = SyncEngine::new(remote, Arc::new(EventBus::new()), None);

    let outcome = engine.sync(&recorder).unwrap();
    assert_eq!(outcome, SyncOutcome { pulled: 5, pushed: 0 });

    let local: HashSet<Uuid> = recorder
        .store()
        .session_ids()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(local, expected);
    assert_eq!(recorder.store().load_stats().total_completed, 5);
}

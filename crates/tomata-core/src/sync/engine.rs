//! Union-merge reconciliation between the local store and a remote store.
//!
//! The merged set is the union of both sides keyed by session id; sessions
//! are immutable once recorded, so there are no field-level conflicts to
//! resolve. A pull that succeeds is kept even if the subsequent push fails:
//! local history only ever grows during sync.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::events::{Event, EventBus};
use crate::recorder::SessionRecorder;
use crate::session::Session;
use crate::storage::history::LAST_SYNCED_KEY;
use crate::sync::client::RemoteStore;
use crate::sync::types::{SyncError, SyncOutcome, SyncStatus};

pub struct SyncEngine<R: RemoteStore> {
    remote: R,
    status: Mutex<SyncStatus>,
    bus: Arc<EventBus>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R, bus: Arc<EventBus>, last_synced: Option<DateTime<Utc>>) -> Self {
        Self {
            remote,
            status: Mutex::new(SyncStatus {
                in_progress: false,
                last_synced,
                last_error: None,
            }),
            bus,
        }
    }

    /// Build the engine with `last_synced` restored from the local store.
    pub fn with_persisted_marker(
        remote: R,
        bus: Arc<EventBus>,
        recorder: &SessionRecorder,
    ) -> Result<Self, SyncError> {
        let last_synced = recorder
            .store()
            .kv_get(LAST_SYNCED_KEY)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc));
        Ok(Self::new(remote, bus, last_synced))
    }

    pub fn status(&self) -> SyncStatus {
        match self.status.lock() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Run one reconciliation pass.
    ///
    /// Overlapping calls are coalesced: if a pass is already in progress the
    /// call returns an empty outcome without touching either store.
    pub fn sync(&self, recorder: &SessionRecorder) -> Result<SyncOutcome, SyncError> {
        let now = Utc::now();
        {
            let mut status = self.lock_status();
            if status.in_progress {
                return Ok(SyncOutcome::default());
            }
            status.in_progress = true;
        }
        self.bus.publish(&Event::SyncStarted { at: now });

        let result = self.reconcile(recorder);

        let mut status = self.lock_status();
        status.in_progress = false;
        match &result {
            Ok(outcome) => {
                let finished = Utc::now();
                status.last_synced = Some(finished);
                status.last_error = None;
                drop(status);
                self.persist_marker(recorder, finished);
                self.bus.publish(&Event::SyncCompleted {
                    pulled: outcome.pulled,
                    pushed: outcome.pushed,
                    at: finished,
                });
            }
            Err(error) => {
                let message = error.to_string();
                status.last_error = Some(message.clone());
                drop(status);
                self.bus.publish(&Event::SyncFailed {
                    message,
                    at: Utc::now(),
                });
            }
        }
        result
    }

    fn reconcile(&self, recorder: &SessionRecorder) -> Result<SyncOutcome, SyncError> {
        // If the remote cannot be read at all, abort with local state untouched.
        let remote_sessions = self.remote.fetch_all()?;

        let store = recorder.store();
        let local_sessions = store.all_sessions()?;
        let local_ids: HashSet<Uuid> = local_sessions.iter().map(|s| s.id).collect();
        let remote_ids: HashSet<Uuid> = remote_sessions.iter().map(|s| s.id).collect();

        // Pull: append remote-only sessions. Inserts are idempotent on id,
        // so a session that raced in through another path is simply skipped.
        let mut pulled = 0usize;
        for session in remote_sessions
            .iter()
            .filter(|session| !local_ids.contains(&session.id))
        {
            if store.insert_session(session)? {
                pulled += 1;
            }
        }
        if pulled > 0 {
            recorder.recompute_stats()?;
        }

        // Push: send local-only sessions. A failure here leaves everything
        // pulled so far in place; the push is retried on the next pass.
        let to_push: Vec<Session> = local_sessions
            .iter()
            .filter(|session| !remote_ids.contains(&session.id))
            .cloned()
            .collect();
        if !to_push.is_empty() {
            self.remote.upsert(&to_push)?;
        }

        Ok(SyncOutcome {
            pulled,
            pushed: to_push.len(),
        })
    }

    /// Persist the success marker in the kv table and the stats blob. Marker
    /// write failures are not fatal: the sessions themselves already landed.
    fn persist_marker(&self, recorder: &SessionRecorder, finished: DateTime<Utc>) {
        let store = recorder.store();
        let _ = store.kv_set(LAST_SYNCED_KEY, &finished.to_rfc3339());
        let mut stats = store.load_stats();
        stats.last_synced = Some(finished);
        let _ = store.save_stats(&stats);
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, SyncStatus> {
        match self.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::history::HistoryStore;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;

    /// In-memory remote with scriptable failures.
    struct FakeRemote {
        sessions: StdMutex<Vec<Session>>,
        fail_fetch: bool,
        fail_upsert: bool,
    }

    impl FakeRemote {
        fn new(sessions: Vec<Session>) -> Self {
            Self {
                sessions: StdMutex::new(sessions),
                fail_fetch: false,
                fail_upsert: false,
            }
        }
    }

    impl RemoteStore for FakeRemote {
        fn fetch_all(&self) -> Result<Vec<Session>, SyncError> {
            if self.fail_fetch {
                return Err(SyncError::Remote("fetch refused".into()));
            }
            Ok(self.sessions.lock().unwrap().clone())
        }

        fn upsert(&self, sessions: &[Session]) -> Result<(), SyncError> {
            if self.fail_upsert {
                return Err(SyncError::Remote("upsert refused".into()));
            }
            let mut held = self.sessions.lock().unwrap();
            for session in sessions {
                if !held.iter().any(|s| s.id == session.id) {
                    held.push(session.clone());
                }
            }
            Ok(())
        }

        fn delete(&self, ids: &[Uuid]) -> Result<(), SyncError> {
            let mut held = self.sessions.lock().unwrap();
            held.retain(|s| !ids.contains(&s.id));
            Ok(())
        }
    }

    fn session_at(hour: u32) -> Session {
        let started = Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap();
        Session {
            id: Uuid::new_v4(),
            started_at: started,
            ended_at: started + chrono::Duration::seconds(1500),
            duration_secs: 1500,
            is_completed: true,
        }
    }

    fn recorder() -> SessionRecorder {
        let store = HistoryStore::open_memory().unwrap();
        SessionRecorder::new(store, Arc::new(EventBus::new()))
    }

    #[test]
    fn union_merge_pulls_and_pushes() {
        let shared = session_at(9);
        let local_only = session_at(10);
        let remote_only = session_at(11);

        let recorder = recorder();
        recorder.record_session(&shared).unwrap();
        recorder.record_session(&local_only).unwrap();

        let remote = FakeRemote::new(vec![shared.clone(), remote_only.clone()]);
        let engine = SyncEngine::new(remote, Arc::new(EventBus::new()), None);

        let outcome = engine.sync(&recorder).unwrap();
        assert_eq!(outcome, SyncOutcome { pulled: 1, pushed: 1 });

        let local_ids: HashSet<Uuid> = recorder
            .store()
            .session_ids()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(local_ids.len(), 3);
        assert!(local_ids.contains(&remote_only.id));

        let remote_ids: HashSet<Uuid> = engine
            .remote
            .sessions
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(remote_ids, local_ids);

        let status = engine.status();
        assert!(status.last_synced.is_some());
        assert!(status.last_error.is_none());
        assert_eq!(
            recorder.store().load_stats().last_synced,
            status.last_synced
        );
    }

    #[test]
    fn fetch_failure_leaves_local_untouched() {
        let local = session_at(9);
        let recorder = recorder();
        recorder.record_session(&local).unwrap();

        let mut remote = FakeRemote::new(vec![session_at(11)]);
        remote.fail_fetch = true;
        let engine = SyncEngine::new(remote, Arc::new(EventBus::new()), None);

        assert!(engine.sync(&recorder).is_err());
        assert_eq!(recorder.store().session_ids().unwrap(), vec![local.id]);

        let status = engine.status();
        assert!(status.last_synced.is_none());
        assert!(status.last_error.is_some());
        assert!(recorder.store().kv_get(LAST_SYNCED_KEY).unwrap().is_none());
    }

    #[test]
    fn push_failure_keeps_pulled_sessions() {
        let remote_only = session_at(11);
        let local_only = session_at(9);

        let recorder = recorder();
        recorder.record_session(&local_only).unwrap();

        let mut remote = FakeRemote::new(vec![remote_only.clone()]);
        remote.fail_upsert = true;
        let engine = SyncEngine::new(remote, Arc::new(EventBus::new()), None);

        assert!(engine.sync(&recorder).is_err());

        // The pulled session stays, and the stats reflect it.
        let local_ids: HashSet<Uuid> = recorder
            .store()
            .session_ids()
            .unwrap()
            .into_iter()
            .collect();
        assert!(local_ids.contains(&remote_only.id));
        assert_eq!(recorder.store().load_stats().total_completed, 2);

        // But the success marker is not written.
        assert!(engine.status().last_synced.is_none());
        assert!(recorder.store().kv_get(LAST_SYNCED_KEY).unwrap().is_none());
    }

    #[test]
    fn sync_is_idempotent_when_stores_match() {
        let shared = session_at(9);
        let recorder = recorder();
        recorder.record_session(&shared).unwrap();

        let remote = FakeRemote::new(vec![shared]);
        let engine = SyncEngine::new(remote, Arc::new(EventBus::new()), None);

        let outcome = engine.sync(&recorder).unwrap();
        assert_eq!(outcome, SyncOutcome::default());
        assert_eq!(recorder.store().session_ids().unwrap().len(), 1);
    }

    #[test]
    fn publishes_lifecycle_events() {
        let bus = Arc::new(EventBus::new());
        let rx = bus.subscribe();

        let recorder = recorder();
        let engine = SyncEngine::new(FakeRemote::new(vec![session_at(9)]), bus, None);
        engine.sync(&recorder).unwrap();

        assert!(matches!(rx.recv().unwrap(), Event::SyncStarted { .. }));
        assert!(matches!(
            rx.recv().unwrap(),
            Event::SyncCompleted { pulled: 1, pushed: 0, .. }
        ));
    }

    #[test]
    fn restores_marker_from_store() {
        let recorder = recorder();
        let stamp = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        recorder
            .store()
            .kv_set(LAST_SYNCED_KEY, &stamp.to_rfc3339())
            .unwrap();

        let engine = SyncEngine::with_persisted_marker(
            FakeRemote::new(vec![]),
            Arc::new(EventBus::new()),
            &recorder,
        )
        .unwrap();
        assert_eq!(engine.status().last_synced, Some(stamp));
    }
}

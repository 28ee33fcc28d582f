//! Session recorder.
//!
//! Turns completed intervals into immutable session records and keeps the
//! statistics blob current: incrementally on record, by full replay on the
//! bulk-clear paths (incremental deltas drift; replay cannot). Publishes a
//! `SessionRecorded` event after every new write so open views refresh.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::events::{Event, EventBus};
use crate::session::Session;
use crate::stats::Stats;
use crate::storage::history::HistoryStore;
use crate::timer::CompletedInterval;

pub struct SessionRecorder {
    store: HistoryStore,
    bus: Arc<EventBus>,
}

impl SessionRecorder {
    pub fn new(store: HistoryStore, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Record a completed interval, returning the new session's id.
    pub fn record(&self, interval: &CompletedInterval) -> Result<Uuid, StoreError> {
        let session = Session::new(
            interval.started_at,
            interval.ended_at,
            interval.duration_secs,
            interval.phase,
        );
        self.record_session(&session)?;
        Ok(session.id)
    }

    /// Append one session. Safe to call again with the same session: the
    /// insert is idempotent on id and stats are only touched for new rows.
    pub fn record_session(&self, session: &Session) -> Result<(), StoreError> {
        if self.store.insert_session(session)? {
            self.update_stats(session)?;
            self.bus.publish(&Event::SessionRecorded {
                id: session.id,
                is_completed: session.is_completed,
                at: Utc::now(),
            });
        }
        Ok(())
    }

    fn update_stats(&self, session: &Session) -> Result<(), StoreError> {
        let mut stats = self.store.load_stats();
        if session.is_completed {
            stats.total_completed += 1;
            stats.total_work_secs += session.duration_secs;

            let day = session.day_key();
            let day_count = self.store.completed_count_on(day)?;
            if day_count > stats.most_productive_day_count {
                stats.most_productive_day_count = day_count;
                stats.most_productive_day = Some(day);
            }
        }
        stats.last_updated = Some(Utc::now());
        self.store.save_stats(&stats)
    }

    /// Rebuild the statistics blob from the full session set.
    pub fn recompute_stats(&self) -> Result<Stats, StoreError> {
        let sessions = self.store.all_sessions()?;
        let last_synced = self.store.load_stats().last_synced;
        let stats = Stats::replay(&sessions, last_synced);
        self.store.save_stats(&stats)?;
        Ok(stats)
    }

    /// Remove every session and zero the statistics.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.store.delete_all_sessions()?;
        self.store.save_stats(&Stats::default())
    }

    /// Remove sessions older than `cutoff` and rebuild statistics from the
    /// remaining set. Returns how many sessions were removed.
    pub fn clear_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let deleted = self.store.delete_older_than(cutoff)?;
        self.recompute_stats()?;
        Ok(deleted)
    }
}

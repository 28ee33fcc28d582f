//! Aggregate statistics cache.
//!
//! Always fully reconstructible by replaying the stored session set; the
//! blob is a performance cache, never a source of truth. Stored as JSON in
//! the kv table under [`crate::storage::history::STATS_KEY`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Completed work intervals, all time.
    pub total_completed: u64,
    /// Total nominal work duration in seconds, all time.
    pub total_work_secs: u64,
    /// Day with the highest completed-work count seen so far.
    pub most_productive_day: Option<NaiveDate>,
    pub most_productive_day_count: u64,
    /// When this blob was last recalculated.
    pub last_updated: Option<DateTime<Utc>>,
    /// Last fully successful cloud sync.
    pub last_synced: Option<DateTime<Utc>>,
}

impl Stats {
    /// Rebuild the whole blob from a session set.
    ///
    /// `last_synced` carries over: it tracks the sync engine, not the
    /// session set.
    pub fn replay(sessions: &[Session], last_synced: Option<DateTime<Utc>>) -> Self {
        let mut stats = Stats {
            last_synced,
            ..Stats::default()
        };
        let mut per_day: std::collections::BTreeMap<NaiveDate, u64> =
            std::collections::BTreeMap::new();

        for session in sessions.iter().filter(|s| s.is_completed) {
            stats.total_completed += 1;
            stats.total_work_secs += session.duration_secs;
            *per_day.entry(session.day_key()).or_default() += 1;
        }

        for (day, count) in per_day {
            // Strictly-greater keeps the earliest day on ties.
            if count > stats.most_productive_day_count {
                stats.most_productive_day_count = count;
                stats.most_productive_day = Some(day);
            }
        }

        stats.last_updated = Some(Utc::now());
        stats
    }
}

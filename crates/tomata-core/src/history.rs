//! Read-side queries over recorded sessions.
//!
//! Listing queries return both work and break sessions; the productivity
//! aggregates count only completed work sessions. Tie-breaking in the
//! "most productive" helpers is deterministic: the earliest bucket wins.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

use crate::error::StoreError;
use crate::session::{Session, TimeOfDay};
use crate::storage::history::HistoryStore;

/// Query facade over the session store.
pub struct History<'a> {
    store: &'a HistoryStore,
}

impl<'a> History<'a> {
    pub fn new(store: &'a HistoryStore) -> Self {
        Self { store }
    }

    /// Sessions that started on `day`.
    pub fn for_day(&self, day: NaiveDate) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .store
            .all_sessions()?
            .into_iter()
            .filter(|s| s.day_key() == day)
            .collect())
    }

    /// Sessions in the ISO week containing `date`.
    pub fn for_week(&self, date: NaiveDate) -> Result<Vec<Session>, StoreError> {
        let week = date.iso_week();
        let key = (week.year(), week.week());
        Ok(self
            .store
            .all_sessions()?
            .into_iter()
            .filter(|s| s.week_key() == key)
            .collect())
    }

    /// Sessions in the calendar month containing `date`.
    pub fn for_month(&self, date: NaiveDate) -> Result<Vec<Session>, StoreError> {
        let key = (date.year(), date.month());
        Ok(self
            .store
            .all_sessions()?
            .into_iter()
            .filter(|s| s.month_key() == key)
            .collect())
    }

    /// Sessions in the day range `[from, to)`: from the start of `from` up
    /// to but excluding the start of `to`.
    pub fn in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Session>, StoreError> {
        let start = day_start(from);
        let end = day_start(to);
        Ok(self
            .store
            .all_sessions()?
            .into_iter()
            .filter(|s| s.started_at >= start && s.started_at < end)
            .collect())
    }

    /// Distinct days having at least one session, sorted ascending. Backs
    /// the calendar-dot indicators.
    pub fn days_with_sessions(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let days: BTreeSet<NaiveDate> = self
            .store
            .all_sessions()?
            .into_iter()
            .map(|s| s.day_key())
            .collect();
        Ok(days.into_iter().collect())
    }
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

// ── Aggregation helpers (pure, over a session slice) ─────────────────

pub fn group_by_day(sessions: &[Session]) -> BTreeMap<NaiveDate, Vec<Session>> {
    let mut groups: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
    for session in sessions {
        groups.entry(session.day_key()).or_default().push(session.clone());
    }
    groups
}

pub fn group_by_time_of_day(sessions: &[Session]) -> BTreeMap<TimeOfDay, Vec<Session>> {
    let mut groups: BTreeMap<TimeOfDay, Vec<Session>> = BTreeMap::new();
    for session in sessions {
        groups.entry(session.time_of_day()).or_default().push(session.clone());
    }
    groups
}

fn max_by_completed<K: Copy + Ord>(counts: BTreeMap<K, u64>) -> Option<K> {
    // BTreeMap iteration order plus strictly-greater comparison gives the
    // earliest key on ties.
    let mut best: Option<(K, u64)> = None;
    for (key, count) in counts {
        if count > 0 && best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}

fn completed_counts<K: Ord + Copy>(
    sessions: &[Session],
    key: impl Fn(&Session) -> K,
) -> BTreeMap<K, u64> {
    let mut counts: BTreeMap<K, u64> = BTreeMap::new();
    for session in sessions.iter().filter(|s| s.is_completed) {
        *counts.entry(key(session)).or_default() += 1;
    }
    counts
}

/// Bucket with the highest completed-work count, or `None` when the set has
/// no completed sessions.
pub fn most_productive_time_of_day(sessions: &[Session]) -> Option<TimeOfDay> {
    max_by_completed(completed_counts(sessions, |s| s.time_of_day()))
}

pub fn most_productive_weekday(sessions: &[Session]) -> Option<Weekday> {
    // Weekday has no Ord; key by days-from-Monday and map back.
    max_by_completed(completed_counts(sessions, |s| {
        s.started_at.weekday().num_days_from_monday()
    }))
    .map(|n| match n {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    })
}

/// Day-of-month (1-31) with the highest completed-work count.
pub fn most_productive_month_day(sessions: &[Session]) -> Option<u32> {
    max_by_completed(completed_counts(sessions, |s| s.started_at.day()))
}

/// Completed-work count and total nominal work seconds of a session set.
pub fn productivity_totals(sessions: &[Session]) -> (u64, u64) {
    sessions
        .iter()
        .filter(|s| s.is_completed)
        .fold((0, 0), |(count, secs), s| {
            (count + 1, secs + s.duration_secs)
        })
}

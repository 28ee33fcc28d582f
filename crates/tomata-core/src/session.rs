//! Immutable session records.
//!
//! A [`Session`] is written once when an interval naturally completes and is
//! never edited afterwards; the only deletions are the bulk-clear paths on
//! the recorder. The derived bucket keys here back the history queries and
//! the calendar views.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::Phase;

/// Coarse time-of-day bucket, keyed by the hour a session started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Bucket thresholds: [5,12) morning, [12,17) afternoon, [17,21) evening,
    /// everything else night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        }
    }
}

/// One completed interval.
///
/// `duration_secs` is the configured interval length snapshot taken when the
/// interval started, not `ended_at - started_at`: pause time is excluded from
/// elapsed accounting, so the nominal length is the stable value to keep.
///
/// `is_completed` discriminates the phase kind: `true` for a work interval,
/// `false` for a break. The name matches the remote record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub is_completed: bool,
}

impl Session {
    pub fn new(
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        duration_secs: u64,
        phase: Phase,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            ended_at,
            duration_secs,
            is_completed: phase == Phase::Work,
        }
    }

    /// Calendar day the session started on.
    pub fn day_key(&self) -> chrono::NaiveDate {
        self.started_at.date_naive()
    }

    /// ISO week the session started in, as (year, week).
    pub fn week_key(&self) -> (i32, u32) {
        let week = self.started_at.iso_week();
        (week.year(), week.week())
    }

    /// Calendar month the session started in, as (year, month).
    pub fn month_key(&self) -> (i32, u32) {
        (self.started_at.year(), self.started_at.month())
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_hour(self.started_at.hour())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(hour: u32, minute: u32) -> Session {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap();
        Session::new(start, start + chrono::Duration::seconds(1500), 1500, Phase::Work)
    }

    #[test]
    fn time_of_day_boundaries() {
        assert_eq!(at_hour(4, 0).time_of_day(), TimeOfDay::Night);
        assert_eq!(at_hour(5, 0).time_of_day(), TimeOfDay::Morning);
        assert_eq!(at_hour(11, 59).time_of_day(), TimeOfDay::Morning);
        assert_eq!(at_hour(12, 0).time_of_day(), TimeOfDay::Afternoon);
        assert_eq!(at_hour(16, 59).time_of_day(), TimeOfDay::Afternoon);
        assert_eq!(at_hour(17, 0).time_of_day(), TimeOfDay::Evening);
        assert_eq!(at_hour(20, 59).time_of_day(), TimeOfDay::Evening);
        assert_eq!(at_hour(21, 0).time_of_day(), TimeOfDay::Night);
    }

    #[test]
    fn bucket_keys() {
        let s = at_hour(9, 30);
        assert_eq!(s.day_key(), chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(s.week_key(), (2025, 11));
        assert_eq!(s.month_key(), (2025, 3));
    }

    #[test]
    fn break_session_is_not_completed() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let s = Session::new(start, start, 300, Phase::Break);
        assert!(!s.is_completed);
    }

    #[test]
    fn session_json_roundtrip() {
        let s = at_hour(9, 0);
        let json = serde_json::to_string(&s).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, s);
    }
}

//! Timer state machine.
//!
//! Two phases, `Work` and `Break`, each running or paused. The engine has no
//! internal thread: the host drives it by calling `tick()` on a short fixed
//! interval and forwards lifecycle transitions through `on_suspend` /
//! `on_resume`. Every operation takes the current wall-clock time explicitly,
//! so the engine is lifecycle-agnostic and testable with synthetic
//! timestamps.
//!
//! ## State transitions
//!
//! ```text
//! Work(paused) -> Work(running) -> Break(paused|running) -> Work(...)
//! ```
//!
//! The duration snapshot taken at interval start is frozen until the interval
//! ends; a configuration change mid-run never alters the active interval.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::tracker::ElapsedTracker;
use crate::events::Event;
use crate::storage::config::{AutoStartConfig, Config, TimerConfig};

/// Seconds the config-change advisory stays visible before auto-dismissing.
pub const ADVISORY_DISMISS_SECS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    pub fn flipped(self) -> Self {
        match self {
            Phase::Work => Phase::Break,
            Phase::Break => Phase::Work,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Focus Time",
            Phase::Break => "Break Time",
        }
    }
}

/// Payload describing an interval that ran down to zero. The recorder turns
/// this into a [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedInterval {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Nominal configured length, not wall-clock span.
    pub duration_secs: u64,
}

/// Work/break cycle state machine with wall-clock elapsed accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    config: TimerConfig,
    auto_start: AutoStartConfig,
    phase: Phase,
    running: bool,
    /// Duration snapshot for the active interval, milliseconds. Frozen while
    /// the interval is in progress.
    session_total_ms: u64,
    tracker: ElapsedTracker,
    /// Work intervals completed since construction; re-seeded from history
    /// at startup.
    completed_work: u32,
    /// Wall-clock start of the current interval, for the session record.
    #[serde(default)]
    interval_started_at: Option<DateTime<Utc>>,
    /// Set between `on_suspend` and `on_resume`.
    #[serde(default)]
    suspended: bool,
    /// When the config-change advisory was raised, if any.
    #[serde(default)]
    advisory_since: Option<DateTime<Utc>>,
}

impl TimerEngine {
    /// Create an engine in the initial state: `Work`, paused, full duration.
    pub fn new(config: &Config) -> Self {
        let timer = config.timer.clone();
        let session_total_ms = timer.work_secs() * 1000;
        Self {
            config: timer,
            auto_start: config.auto_start.clone(),
            phase: Phase::Work,
            running: false,
            session_total_ms,
            tracker: ElapsedTracker::default(),
            completed_work: 0,
            interval_started_at: None,
            suspended: false,
            advisory_since: None,
        }
    }

    /// Seed the completed-work counter from persisted history (count of
    /// completed work sessions recorded today).
    pub fn seed_completed_work(&mut self, count: u32) {
        self.completed_work = count;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn completed_work(&self) -> u32 {
        self.completed_work
    }

    pub fn session_total_secs(&self) -> u64 {
        self.session_total_ms / 1000
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        self.session_total_ms
            .saturating_sub(self.tracker.elapsed_ms(epoch_ms(now)))
    }

    /// Remaining time rounded to the nearest whole second for display.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.remaining_ms(now) + 500) / 1000
    }

    /// 1.0 at interval start, 0.0 at completion.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        if self.session_total_ms == 0 {
            return 0.0;
        }
        self.remaining_ms(now) as f64 / self.session_total_ms as f64
    }

    /// Whether the transient config-change advisory should be shown.
    pub fn advisory_visible(&self, now: DateTime<Utc>) -> bool {
        self.advisory_since
            .map(|since| now - since < Duration::seconds(ADVISORY_DISMISS_SECS))
            .unwrap_or(false)
    }

    pub fn dismiss_advisory(&mut self) {
        self.advisory_since = None;
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            running: self.running,
            remaining_ms: self.remaining_ms(now),
            total_ms: self.session_total_ms,
            progress: self.progress(now),
            completed_work: self.completed_work,
            advisory_visible: self.advisory_visible(now),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the active interval. Starting a running timer is a
    /// no-op.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.running {
            return None;
        }
        self.running = true;
        self.suspended = false;
        let resuming = self.interval_started_at.is_some();
        if !resuming {
            // Fresh interval: snapshot the duration for the active phase.
            self.session_total_ms = self.current_phase_duration_secs() * 1000;
            self.interval_started_at = Some(now);
        }
        self.tracker.start(epoch_ms(now));
        if resuming {
            Some(Event::TimerResumed {
                remaining_ms: self.remaining_ms(now),
                at: now,
            })
        } else {
            Some(Event::TimerStarted {
                phase: self.phase,
                total_secs: self.session_total_secs(),
                at: now,
            })
        }
    }

    /// Pause, banking elapsed time. Pausing a paused timer is a no-op.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.tracker.stop(epoch_ms(now));
        self.running = false;
        self.suspended = false;
        Some(Event::TimerPaused {
            remaining_ms: self.remaining_ms(now),
            at: now,
        })
    }

    /// Force `Work`, paused, full duration. Leaves the completed-work count
    /// and persisted history untouched.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.phase = Phase::Work;
        self.running = false;
        self.suspended = false;
        self.session_total_ms = self.config.work_secs() * 1000;
        self.tracker.reset();
        self.interval_started_at = None;
        self.advisory_since = None;
        Some(Event::TimerReset { at: now })
    }

    /// Call periodically while running. Returns `Some(Event::PhaseCompleted)`
    /// when the interval reaches zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.running || self.suspended {
            return None;
        }
        if self.remaining_ms(now) == 0 {
            return Some(self.complete(now));
        }
        None
    }

    /// Host environment is suspending the process. Elapsed accounting keeps
    /// running on wall-clock time; the caller should schedule the backstop
    /// notification from the returned remaining time.
    pub fn on_suspend(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.running || self.suspended {
            return None;
        }
        self.suspended = true;
        Some(Event::TimerSuspended {
            remaining_ms: self.remaining_ms(now),
            at: now,
        })
    }

    /// Host environment resumed the process. Time passed while suspended is
    /// already credited by the wall-clock tracker; if the interval expired in
    /// the background, completion fires immediately, bypassing the tick loop.
    pub fn on_resume(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.suspended {
            return None;
        }
        self.suspended = false;
        if !self.running {
            return None;
        }
        if self.remaining_ms(now) == 0 {
            return Some(self.complete(now));
        }
        Some(Event::TimerResumed {
            remaining_ms: self.remaining_ms(now),
            at: now,
        })
    }

    /// Adopt a new configuration.
    ///
    /// Duration/cadence changes while running leave the in-progress interval
    /// untouched and raise a transient advisory; while paused they recompute
    /// the current phase's remaining and total immediately. Boolean flags
    /// apply silently either way.
    pub fn apply_config(&mut self, config: &Config, now: DateTime<Utc>) -> Option<Event> {
        self.auto_start = config.auto_start.clone();
        if config.timer == self.config {
            return None;
        }
        self.config = config.timer.clone();
        if self.running {
            self.advisory_since = Some(now);
            Some(Event::ConfigDeferred { at: now })
        } else {
            self.session_total_ms = self.current_phase_duration_secs() * 1000;
            self.tracker.reset();
            self.interval_started_at = None;
            None
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self, now: DateTime<Utc>) -> Event {
        let completed = CompletedInterval {
            phase: self.phase,
            started_at: self.interval_started_at.unwrap_or_else(|| {
                now - Duration::milliseconds(self.session_total_ms as i64)
            }),
            ended_at: now,
            duration_secs: self.session_total_secs(),
        };

        let mut long_break = false;
        if self.phase == Phase::Work {
            self.completed_work += 1;
            long_break = self.completed_work % self.config.cadence() == 0;
        }

        let next_phase = self.phase.flipped();
        self.phase = next_phase;
        self.session_total_ms = self.config.duration_secs(next_phase, long_break) * 1000;
        self.tracker.reset();
        self.interval_started_at = None;

        let auto_started = match next_phase {
            Phase::Break => self.auto_start.breaks,
            Phase::Work => self.auto_start.pomodoros,
        };
        if auto_started {
            self.running = true;
            self.tracker.start(epoch_ms(now));
            self.interval_started_at = Some(now);
        } else {
            self.running = false;
        }

        Event::PhaseCompleted {
            completed,
            next_phase,
            next_total_secs: self.session_total_secs(),
            long_break,
            auto_started,
            at: now,
        }
    }

    /// Duration for starting the current phase fresh. Break length follows
    /// the cadence rule on the completed-work count.
    fn current_phase_duration_secs(&self) -> u64 {
        let long_break = self.completed_work > 0
            && self.completed_work % self.config.cadence() == 0;
        self.config.duration_secs(self.phase, long_break)
    }
}

/// Format whole seconds as MM:SS for display.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn epoch_ms(now: DateTime<Utc>) -> u64 {
    now.timestamp_millis().max(0) as u64
}

//! Top-level glue wiring the timer engine, session recorder, and
//! notification dispatcher behind a single entry point.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::events::{Event, EventBus};
use crate::notify::{NotificationDispatcher, Notifier};
use crate::recorder::SessionRecorder;
use crate::storage::config::Config;
use crate::storage::history::HistoryStore;
use crate::timer::{format_mm_ss, Phase, TimerEngine};

/// Read-only view of the timer for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct TimerDisplay {
    pub phase: Phase,
    pub mode_label: &'static str,
    pub remaining: String,
    pub remaining_secs: u64,
    pub progress: f64,
    pub running: bool,
    pub completed_work: u32,
    pub advisory_visible: bool,
}

pub struct PomodoroService {
    config: Config,
    engine: TimerEngine,
    recorder: SessionRecorder,
    dispatcher: NotificationDispatcher,
    bus: Arc<EventBus>,
}

impl PomodoroService {
    /// Build the service over an open store. The work-interval counter is
    /// seeded from today's completed sessions so the long-break cadence
    /// survives restarts.
    pub fn new(
        config: Config,
        store: HistoryStore,
        notifier: Box<dyn Notifier>,
        now: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let bus = Arc::new(EventBus::new());
        let mut engine = TimerEngine::new(&config);
        let today_completed = store.completed_count_on(now.date_naive())?;
        engine.seed_completed_work(today_completed as u32);
        let recorder = SessionRecorder::new(store, bus.clone());
        Ok(Self {
            config,
            engine,
            recorder,
            dispatcher: NotificationDispatcher::new(notifier),
            bus,
        })
    }

    /// Replace the engine with previously persisted state.
    pub fn restore_engine(&mut self, engine: TimerEngine) {
        self.engine = engine;
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_timer_screen_visible(&mut self, visible: bool) {
        self.dispatcher.set_timer_screen_visible(visible);
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.start(now);
        self.publish(event)
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.pause(now);
        if event.is_some() {
            self.dispatcher.cancel_backstop();
        }
        self.publish(event)
    }

    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.reset(now);
        self.dispatcher.cancel_backstop();
        self.publish(event)
    }

    /// Advance the timer; on expiry records the interval and notifies.
    ///
    /// A persistence failure is reported to the caller but leaves the
    /// already-flipped engine state intact, so the cycle keeps going.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Option<Event>, StoreError> {
        let event = self.engine.tick(now);
        if let Some(event) = &event {
            self.handle_completion(event)?;
        }
        Ok(self.publish(event))
    }

    /// Host is about to suspend the process; arm the backstop notification
    /// so an expiry while suspended is still announced.
    pub fn on_suspend(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.on_suspend(now);
        if let Some(Event::TimerSuspended { remaining_ms, .. }) = &event {
            self.dispatcher
                .schedule_backstop(&self.config, self.engine.phase(), *remaining_ms);
        }
        self.publish(event)
    }

    /// Host resumed the process; catch up on wall-clock time that passed.
    pub fn on_resume(&mut self, now: DateTime<Utc>) -> Result<Option<Event>, StoreError> {
        self.dispatcher.cancel_backstop();
        let event = self.engine.on_resume(now);
        if let Some(event) = &event {
            self.handle_completion(event)?;
        }
        Ok(self.publish(event))
    }

    /// Adopt a new configuration, deferring duration changes per the
    /// engine's running/paused policy.
    pub fn apply_config(&mut self, config: Config, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.apply_config(&config, now);
        self.config = config;
        self.publish(event)
    }

    pub fn dismiss_advisory(&mut self) {
        self.engine.dismiss_advisory();
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        self.engine.snapshot(now)
    }

    pub fn display(&self, now: DateTime<Utc>) -> TimerDisplay {
        let remaining_secs = self.engine.remaining_secs(now);
        TimerDisplay {
            phase: self.engine.phase(),
            mode_label: self.engine.phase().label(),
            remaining: format_mm_ss(remaining_secs),
            remaining_secs,
            progress: self.engine.progress(now),
            running: self.engine.is_running(),
            completed_work: self.engine.completed_work(),
            advisory_visible: self.engine.advisory_visible(now),
        }
    }

    fn handle_completion(&self, event: &Event) -> Result<(), StoreError> {
        if let Event::PhaseCompleted {
            completed,
            next_phase,
            ..
        } = event
        {
            self.recorder.record(completed)?;
            self.dispatcher.phase_completed(&self.config, *next_phase);
        }
        Ok(())
    }

    fn publish(&self, event: Option<Event>) -> Option<Event> {
        if let Some(event) = &event {
            self.bus.publish(event);
        }
        event
    }
}

use std::sync::Arc;

use chrono::Utc;
use clap::Subcommand;
use tomata_core::storage::history::ENGINE_KEY;
use tomata_core::{Config, Event, EventBus, HistoryStore, SessionRecorder, TimerEngine};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current interval
    Start,
    /// Pause the current interval
    Pause,
    /// Resume a paused interval (alias for start)
    Resume,
    /// Reset to a fresh work interval
    Reset,
    /// Advance the timer and print the current state as JSON
    Status,
    /// Dismiss the restart advisory
    Dismiss,
}

/// Seed the work-interval counter from today's history so the long-break
/// cadence survives across invocations.
fn fresh_engine(config: &Config, recorder: &SessionRecorder) -> TimerEngine {
    let mut engine = TimerEngine::new(config);
    if let Ok(count) = recorder.store().completed_count_on(Utc::now().date_naive()) {
        engine.seed_completed_work(count as u32);
    }
    engine
}

fn load_engine(config: &Config, recorder: &SessionRecorder) -> TimerEngine {
    if let Ok(Some(json)) = recorder.store().kv_get(ENGINE_KEY) {
        if let Ok(engine) = serde_json::from_str::<TimerEngine>(&json) {
            return engine;
        }
    }
    fresh_engine(config, recorder)
}

fn save_engine(
    recorder: &SessionRecorder,
    engine: &TimerEngine,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(engine)?;
    recorder.store().kv_set(ENGINE_KEY, &json)?;
    Ok(())
}

/// Persist a completed interval. A failure is reported but does not abort:
/// the engine state has already flipped and should be saved regardless.
fn handle_completion(recorder: &SessionRecorder, event: &Event) {
    if let Event::PhaseCompleted { completed, .. } = event {
        if let Err(e) = recorder.record(completed) {
            eprintln!("warning: failed to record session: {e}");
        }
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = HistoryStore::open()?;
    let recorder = SessionRecorder::new(store, Arc::new(EventBus::new()));
    let mut engine = load_engine(&config, &recorder);
    let now = Utc::now();

    match action {
        TimerAction::Start | TimerAction::Resume => {
            if let Some(event) = engine.start(now) {
                println!("{}", serde_json::to_string_pretty(&event)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot(now))?);
            }
        }
        TimerAction::Pause => {
            if let Some(event) = engine.pause(now) {
                println!("{}", serde_json::to_string_pretty(&event)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot(now))?);
            }
        }
        TimerAction::Reset => {
            engine.reset(now);
            println!("{{\"type\": \"timer_reset\"}}");
        }
        TimerAction::Status => {
            let completed = engine.tick(now);
            println!("{}", serde_json::to_string_pretty(&engine.snapshot(now))?);
            if let Some(event) = completed {
                println!("{}", serde_json::to_string_pretty(&event)?);
                handle_completion(&recorder, &event);
            }
        }
        TimerAction::Dismiss => {
            engine.dismiss_advisory();
            println!("{}", serde_json::to_string_pretty(&engine.snapshot(now))?);
        }
    }

    save_engine(&recorder, &engine)?;
    Ok(())
}

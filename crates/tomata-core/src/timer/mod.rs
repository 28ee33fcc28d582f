mod engine;
mod tracker;

pub use engine::{format_mm_ss, CompletedInterval, Phase, TimerEngine, ADVISORY_DISMISS_SECS};
pub use tracker::ElapsedTracker;

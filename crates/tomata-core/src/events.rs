//! Typed events and the fan-out bus.
//!
//! Every state change produces an [`Event`]. The CLI prints them; the
//! history layer and any open views subscribe through [`EventBus`] to
//! refresh after writes. Delivery is ordered per publisher and at-least-once
//! for every live subscriber.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{CompletedInterval, Phase};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// Host environment suspended the process with an interval active.
    TimerSuspended {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// An interval ran down to zero and the cycle flipped phase.
    PhaseCompleted {
        completed: CompletedInterval,
        next_phase: Phase,
        next_total_secs: u64,
        long_break: bool,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    /// A duration/cadence change arrived while running; it applies to the
    /// next interval and a transient advisory was raised.
    ConfigDeferred {
        at: DateTime<Utc>,
    },
    SessionRecorded {
        id: Uuid,
        is_completed: bool,
        at: DateTime<Utc>,
    },
    SyncStarted {
        at: DateTime<Utc>,
    },
    SyncCompleted {
        pulled: usize,
        pushed: usize,
        at: DateTime<Utc>,
    },
    SyncFailed {
        message: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        running: bool,
        remaining_ms: u64,
        total_ms: u64,
        progress: f64,
        completed_work: u32,
        advisory_visible: bool,
        at: DateTime<Utc>,
    },
}

/// Minimal fan-out bus over std mpsc channels.
///
/// Subscribers that drop their receiver are pruned on the next publish.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn publish(&self, event: &Event) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_in_order() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        bus.publish(&Event::TimerReset { at: Utc::now() });
        bus.publish(&Event::SyncStarted { at: Utc::now() });
        assert!(matches!(rx.recv().unwrap(), Event::TimerReset { .. }));
        assert!(matches!(rx.recv().unwrap(), Event::SyncStarted { .. }));
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        drop(bus.subscribe());
        let rx = bus.subscribe();
        bus.publish(&Event::TimerReset { at: Utc::now() });
        assert!(rx.recv().is_ok());
        assert_eq!(bus.subscribers.lock().unwrap().len(), 1);
    }
}

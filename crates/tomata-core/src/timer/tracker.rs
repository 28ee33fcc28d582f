//! Wall-clock elapsed accounting for one interval.
//!
//! Tick-based counting silently loses time while the process is suspended,
//! so elapsed time is derived from wall-clock timestamps: a bank of
//! milliseconds accumulated across pause/resume cycles plus a live start
//! timestamp while running.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedTracker {
    /// Milliseconds banked across pause/resume cycles.
    accumulated_ms: u64,
    /// Epoch ms of the last start/resume; `None` while stopped.
    #[serde(default)]
    running_since_ms: Option<u64>,
}

impl ElapsedTracker {
    /// Begin (or continue) accruing live time. Starting an already-running
    /// tracker is a no-op.
    pub fn start(&mut self, now_ms: u64) {
        if self.running_since_ms.is_none() {
            self.running_since_ms = Some(now_ms);
        }
    }

    /// Bank the live span and stop accruing. Stopping a stopped tracker is
    /// a no-op.
    pub fn stop(&mut self, now_ms: u64) {
        if let Some(since) = self.running_since_ms.take() {
            self.accumulated_ms += now_ms.saturating_sub(since);
        }
    }

    /// Total elapsed: banked milliseconds plus the live span, if running.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let live = self
            .running_since_ms
            .map(|since| now_ms.saturating_sub(since))
            .unwrap_or(0);
        self.accumulated_ms + live
    }

    pub fn is_running(&self) -> bool {
        self.running_since_ms.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

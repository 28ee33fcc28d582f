//! System notification seam.
//!
//! The core never talks to a platform notification API directly; it builds
//! [`PhaseNotice`] payloads and hands them to a [`Notifier`] implementation.
//! The dispatcher applies the user's notification/sound flags, suppresses
//! banners while the timer screen is visible, and manages the single
//! backstop notification scheduled for interval end while suspended.
//! Delivery failures, including denied permission, are non-fatal.

use chrono::Duration;

use crate::error::NotifyError;
use crate::storage::config::Config;
use crate::timer::Phase;

/// A user-visible notification announcing the phase being entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseNotice {
    pub title: String,
    pub body: String,
    pub with_sound: bool,
}

impl PhaseNotice {
    pub fn entering(next: Phase, with_sound: bool) -> Self {
        let (title, body) = match next {
            Phase::Break => (
                "Break time!",
                "You completed your work session. Take a break.",
            ),
            Phase::Work => ("Back to work!", "Break is over. Time to focus."),
        };
        Self {
            title: title.to_string(),
            body: body.to_string(),
            with_sound,
        }
    }
}

/// Platform notification backend.
pub trait Notifier {
    /// Deliver a notice immediately.
    fn deliver(&self, notice: &PhaseNotice) -> Result<(), NotifyError>;

    /// Schedule exactly one deferred notice to fire after `fire_in`.
    /// Replaces any previously scheduled backstop.
    fn schedule_backstop(&self, notice: &PhaseNotice, fire_in: Duration)
        -> Result<(), NotifyError>;

    /// Cancel the pending backstop, if any.
    fn cancel_backstop(&self);
}

/// Backend that drops everything. Used when the host has no notification
/// surface and in tests that don't observe delivery.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn deliver(&self, _notice: &PhaseNotice) -> Result<(), NotifyError> {
        Ok(())
    }

    fn schedule_backstop(
        &self,
        _notice: &PhaseNotice,
        _fire_in: Duration,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    fn cancel_backstop(&self) {}
}

/// Applies configuration flags and screen-visibility policy in front of a
/// [`Notifier`] backend.
pub struct NotificationDispatcher {
    notifier: Box<dyn Notifier>,
    timer_screen_visible: bool,
}

impl NotificationDispatcher {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            notifier,
            timer_screen_visible: false,
        }
    }

    /// The UI reports whether the timer screen is currently on display;
    /// banners are suppressed while it is.
    pub fn set_timer_screen_visible(&mut self, visible: bool) {
        self.timer_screen_visible = visible;
    }

    /// Announce a completed phase transition, honoring the configured flags.
    pub fn phase_completed(&self, config: &Config, next: Phase) {
        if !config.notifications.enabled || self.timer_screen_visible {
            return;
        }
        let notice = PhaseNotice::entering(next, config.notifications.sound);
        // Permission denial and delivery failures are deliberately ignored;
        // the timer keeps working without notifications.
        let _ = self.notifier.deliver(&notice);
    }

    /// Schedule the backstop notice timed to fire at interval end while the
    /// process is suspended.
    pub fn schedule_backstop(&self, config: &Config, current: Phase, remaining_ms: u64) {
        if !config.notifications.enabled {
            return;
        }
        let notice = PhaseNotice::entering(current.flipped(), config.notifications.sound);
        let _ = self
            .notifier
            .schedule_backstop(&notice, Duration::milliseconds(remaining_ms as i64));
    }

    pub fn cancel_backstop(&self) {
        self.notifier.cancel_backstop();
    }
}

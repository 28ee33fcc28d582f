//! # Tomata Core Library
//!
//! Core business logic for the Tomata Pomodoro timer. All operations are
//! available through this library; the CLI binary is a thin layer over it.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the
//!   caller to periodically invoke `tick()` for progress updates
//! - **Storage**: SQLite-based session history and TOML-based configuration
//! - **Recorder**: Turns completed intervals into immutable session records
//!   and keeps the aggregate stats blob current
//! - **Sync**: Union-merge reconciliation against a remote session store
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`HistoryStore`]: Session and statistics persistence
//! - [`Config`]: Application configuration management
//! - [`SyncEngine`]: Cloud backup reconciler
//! - [`PomodoroService`]: Glue wiring engine, recorder, and notifications

pub mod error;
pub mod events;
pub mod history;
pub mod notify;
pub mod recorder;
pub mod service;
pub mod session;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod timer;

pub use error::{ConfigError, CoreError, NotifyError, StoreError};
pub use events::{Event, EventBus};
pub use history::History;
pub use notify::{NotificationDispatcher, Notifier, NullNotifier, PhaseNotice};
pub use recorder::SessionRecorder;
pub use service::{PomodoroService, TimerDisplay};
pub use session::{Session, TimeOfDay};
pub use stats::Stats;
pub use storage::config::Config;
pub use storage::history::HistoryStore;
pub use sync::{HttpRemoteStore, RemoteStore, SyncEngine, SyncError, SyncOutcome, SyncStatus};
pub use timer::{format_mm_ss, CompletedInterval, Phase, TimerEngine};

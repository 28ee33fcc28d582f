//! SQLite-backed session store.
//!
//! Two tables: `sessions` holds the append-only session records keyed by
//! their uuid, `kv` holds the statistics blob, the persisted timer engine
//! state, and the last-synced marker under stable keys. Session rows are
//! immutable once written; only the bulk-clear paths delete.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::data_dir;
use crate::error::StoreError;
use crate::session::Session;
use crate::stats::Stats;

/// kv key for the statistics blob.
pub const STATS_KEY: &str = "stats";
/// kv key for the persisted timer engine snapshot.
pub const ENGINE_KEY: &str = "timer_engine";
/// kv key for the last fully successful sync timestamp.
pub const LAST_SYNCED_KEY: &str = "last_synced";

/// SQLite store for sessions and the statistics cache.
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open the store at `~/.config/tomata/tomata.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .join("tomata.db");
        Self::open_at(&path)
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store (for tests and tooling).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    id            TEXT PRIMARY KEY,
                    started_at    TEXT NOT NULL,
                    ended_at      TEXT NOT NULL,
                    duration_secs INTEGER NOT NULL,
                    is_completed  INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
                CREATE INDEX IF NOT EXISTS idx_sessions_is_completed ON sessions(is_completed);",
            )
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    /// Append one session. Idempotent on id: re-inserting an existing id is
    /// a no-op, which makes at-least-once callers safe.
    ///
    /// Returns `true` if a new row was written.
    pub fn insert_session(&self, session: &Session) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO sessions (id, started_at, ended_at, duration_secs, is_completed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.to_string(),
                session.started_at.to_rfc3339(),
                session.ended_at.to_rfc3339(),
                session.duration_secs,
                session.is_completed,
            ],
        )?;
        Ok(changed > 0)
    }

    /// All sessions ordered by start time.
    ///
    /// Rows with undecodable timestamps or ids are skipped rather than
    /// failing the whole read.
    pub fn all_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, ended_at, duration_secs, is_completed
             FROM sessions ORDER BY started_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, started_at, ended_at, duration_secs, is_completed) = row?;
            let parsed = (
                Uuid::parse_str(&id),
                DateTime::parse_from_rfc3339(&started_at),
                DateTime::parse_from_rfc3339(&ended_at),
            );
            if let (Ok(id), Ok(started_at), Ok(ended_at)) = parsed {
                sessions.push(Session {
                    id,
                    started_at: started_at.with_timezone(&Utc),
                    ended_at: ended_at.with_timezone(&Utc),
                    duration_secs,
                    is_completed,
                });
            }
        }
        Ok(sessions)
    }

    /// Ids of every stored session.
    pub fn session_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id FROM sessions")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            if let Ok(id) = Uuid::parse_str(&row?) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Completed work sessions that started on `day`. Used to re-seed the
    /// in-memory counter at startup.
    pub fn completed_count_on(&self, day: NaiveDate) -> Result<u64, StoreError> {
        let (start, end) = day_bounds(day);
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions
             WHERE is_completed = 1 AND started_at >= ?1 AND started_at < ?2",
            params![start, end],
            |row| row.get::<_, u64>(0),
        )?;
        Ok(count)
    }

    /// Remove every session.
    pub fn delete_all_sessions(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM sessions", [])?;
        Ok(())
    }

    /// Remove sessions with `started_at < cutoff`, returning how many were
    /// deleted.
    pub fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM sessions WHERE started_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(deleted)
    }

    // ── kv + stats blob ──────────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Load the statistics blob, falling back to zeroed defaults when the
    /// blob is missing or undecodable.
    pub fn load_stats(&self) -> Stats {
        self.kv_get(STATS_KEY)
            .ok()
            .flatten()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save_stats(&self, stats: &Stats) -> Result<(), StoreError> {
        let json = serde_json::to_string(stats).map_err(|e| StoreError::Undecodable {
            key: STATS_KEY.to_string(),
            message: e.to_string(),
        })?;
        self.kv_set(STATS_KEY, &json)
    }
}

fn day_bounds(day: NaiveDate) -> (String, String) {
    let start = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let end = start + chrono::Duration::days(1);
    (start.to_rfc3339(), end.to_rfc3339())
}

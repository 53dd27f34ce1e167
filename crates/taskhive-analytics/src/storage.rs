use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use taskhive_core::model::{AnalyticsEvent, DashboardSummary, EventType};
use taskhive_core::{HiveError, Result};

/// SQLite-backed append-only event store. Events are written once and read
/// back only through the dashboard aggregates.
pub struct EventStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl EventStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| HiveError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            HiveError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn, PathBuf::from(":memory:"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── helpers ────────────────────────────────────────────────────────

    fn configure_and_init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| HiveError::Storage(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HiveError::Storage(format!("failed to acquire database lock: {e}")))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_name TEXT NOT NULL,
                event_type TEXT NOT NULL,
                source_service TEXT NOT NULL,
                user_id INTEGER,
                metadata TEXT NOT NULL DEFAULT '{}',
                occurred_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_occurred_at ON events(occurred_at);
            CREATE INDEX IF NOT EXISTS idx_events_event_type ON events(event_type);
            ",
        )
        .map_err(|e| HiveError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| HiveError::Storage(format!("failed to acquire database lock: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| HiveError::Storage(format!("blocking task panicked: {e}")))?
    }

    // ── events ─────────────────────────────────────────────────────────

    pub async fn insert_event(&self, mut event: AnalyticsEvent) -> Result<AnalyticsEvent> {
        self.with_conn(move |conn| {
            let metadata = serde_json::to_string(&event.metadata)?;
            conn.execute(
                "INSERT INTO events \
                 (event_name, event_type, source_service, user_id, metadata, occurred_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    event.event_name,
                    event.event_type.to_string(),
                    event.source_service,
                    event.user_id,
                    metadata,
                    event.occurred_at.to_rfc3339(),
                ],
            )
            .map_err(|e| HiveError::Storage(format!("failed to insert event: {e}")))?;
            event.id = conn.last_insert_rowid();
            Ok(event)
        })
        .await
    }

    /// Aggregate the whole store into the dashboard shape. Counts come
    /// from the live table rather than precomputed rollups.
    pub async fn dashboard_summary(&self, now: DateTime<Utc>) -> Result<DashboardSummary> {
        self.with_conn(move |conn| {
            let count = |sql: &str, params: &[&dyn rusqlite::ToSql]| -> Result<usize> {
                conn.query_row(sql, params, |row| row.get::<_, i64>(0))
                    .map(|n| n as usize)
                    .map_err(|e| HiveError::Storage(format!("failed to count events: {e}")))
            };

            let by_type = |t: EventType| {
                count(
                    "SELECT COUNT(*) FROM events WHERE event_type = ?1",
                    &[&t.to_string()],
                )
            };

            let week_ago = (now - Duration::days(7)).to_rfc3339();
            Ok(DashboardSummary {
                total_events: count("SELECT COUNT(*) FROM events", &[])?,
                task_events: by_type(EventType::Task)?,
                user_events: by_type(EventType::User)?,
                system_events: by_type(EventType::System)?,
                events_last_7_days: count(
                    "SELECT COUNT(*) FROM events WHERE occurred_at >= ?1",
                    &[&week_ago],
                )?,
                period: "all_time".to_string(),
                generated_at: now,
            })
        })
        .await
    }

    pub async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| HiveError::Storage(format!("database ping failed: {e}")))
        })
        .await
    }
}

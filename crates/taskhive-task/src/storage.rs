use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};

use taskhive_core::model::{Task, TaskPriority, TaskStatus};
use taskhive_core::{HiveError, Result};

/// SQLite-backed store for tasks. Every query is scoped by `user_id`, so a
/// task owned by someone else is indistinguishable from one that does not
/// exist.
pub struct TaskStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl TaskStore {
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
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
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
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                priority TEXT NOT NULL DEFAULT 'medium',
                user_id INTEGER NOT NULL,
                due_date TEXT,
                completed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_user_status ON tasks(user_id, status);
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

    // ── tasks ──────────────────────────────────────────────────────────

    pub async fn insert_task(&self, mut task: Task) -> Result<Task> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tasks \
                 (title, description, status, priority, user_id, due_date, completed_at, \
                  created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    task.title,
                    task.description,
                    task.status.to_string(),
                    task.priority.to_string(),
                    task.user_id,
                    task.due_date.map(|d| d.to_string()),
                    task.completed_at.map(|t| t.to_rfc3339()),
                    task.created_at.to_rfc3339(),
                    task.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| HiveError::Storage(format!("failed to insert task: {e}")))?;
            task.id = conn.last_insert_rowid();
            Ok(task)
        })
        .await
    }

    pub async fn get_task(&self, id: i64, user_id: i64) -> Result<Option<Task>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{SELECT_TASK} WHERE id = ?1 AND user_id = ?2"),
                [id, user_id],
                row_to_task,
            )
            .optional()
            .map_err(|e| HiveError::Storage(format!("failed to load task: {e}")))
        })
        .await
    }

    /// All of a user's tasks, newest first, optionally narrowed by status
    /// and priority. Date-window filters (overdue, due soon) are applied
    /// by the caller since "today" is its input.
    pub async fn list_tasks(
        &self,
        user_id: i64,
        status: Option<TaskStatus>,
        priority: Option<TaskPriority>,
    ) -> Result<Vec<Task>> {
        self.with_conn(move |conn| {
            let mut sql = format!("{SELECT_TASK} WHERE user_id = ?1");
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user_id)];
            if let Some(status) = status {
                params.push(Box::new(status.to_string()));
                sql.push_str(&format!(" AND status = ?{}", params.len()));
            }
            if let Some(priority) = priority {
                params.push(Box::new(priority.to_string()));
                sql.push_str(&format!(" AND priority = ?{}", params.len()));
            }
            sql.push_str(" ORDER BY created_at DESC, id DESC");

            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| HiveError::Storage(format!("failed to prepare query: {e}")))?;
            let rows = stmt
                .query_map(
                    rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                    row_to_task,
                )
                .map_err(|e| HiveError::Storage(format!("failed to list tasks: {e}")))?;

            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| HiveError::Storage(format!("failed to read task row: {e}")))
        })
        .await
    }

    /// Persist a generic update. Returns `false` when no row matched the
    /// id/owner pair.
    pub async fn update_task(&self, task: Task) -> Result<bool> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4, \
                     due_date = ?5, completed_at = ?6, updated_at = ?7 \
                     WHERE id = ?8 AND user_id = ?9",
                    rusqlite::params![
                        task.title,
                        task.description,
                        task.status.to_string(),
                        task.priority.to_string(),
                        task.due_date.map(|d| d.to_string()),
                        task.completed_at.map(|t| t.to_rfc3339()),
                        task.updated_at.to_rfc3339(),
                        task.id,
                        task.user_id,
                    ],
                )
                .map_err(|e| HiveError::Storage(format!("failed to update task: {e}")))?;
            Ok(changed > 0)
        })
        .await
    }

    /// Compare-and-swap status write: only lands if the row still holds
    /// the status the transition was validated against. `false` means a
    /// concurrent writer got there first.
    pub async fn update_status_cas(&self, task: Task, expected: TaskStatus) -> Result<bool> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE tasks SET status = ?1, completed_at = ?2, updated_at = ?3 \
                     WHERE id = ?4 AND user_id = ?5 AND status = ?6",
                    rusqlite::params![
                        task.status.to_string(),
                        task.completed_at.map(|t| t.to_rfc3339()),
                        task.updated_at.to_rfc3339(),
                        task.id,
                        task.user_id,
                        expected.to_string(),
                    ],
                )
                .map_err(|e| HiveError::Storage(format!("failed to update task status: {e}")))?;
            Ok(changed > 0)
        })
        .await
    }

    pub async fn delete_task(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                    [id, user_id],
                )
                .map_err(|e| HiveError::Storage(format!("failed to delete task: {e}")))?;
            Ok(deleted > 0)
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

const SELECT_TASK: &str = "SELECT id, title, description, status, priority, user_id, due_date, \
                           completed_at, created_at, updated_at FROM tasks";

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_enum(row, 3)?,
        priority: parse_enum(row, 4)?,
        user_id: row.get(5)?,
        due_date: parse_date(row, 6)?,
        completed_at: parse_opt_ts(row, 7)?,
        created_at: parse_ts(row, 8)?,
        updated_at: parse_ts(row, 9)?,
    })
}

fn parse_enum<T: std::str::FromStr<Err = String>>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| conversion_error(idx, e))
}

fn parse_date(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse::<NaiveDate>()
            .map_err(|e| conversion_error(idx, e.to_string()))
    })
    .transpose()
}

fn parse_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e.to_string()))
}

fn parse_opt_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e.to_string()))
    })
    .transpose()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

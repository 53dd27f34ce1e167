use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use taskhive_core::model::{Session, User};
use taskhive_core::{HiveError, Result};

/// SQLite-backed store for accounts and their sessions.
///
/// A single `Connection` behind `Arc<Mutex<>>`, shared across async tasks.
/// All blocking SQLite calls go through [`with_conn`](Self::with_conn)
/// which runs them on the Tokio blocking thread-pool.
pub struct UserStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl UserStore {
    /// Open (or create) a file-backed SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| HiveError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    /// Open an in-memory SQLite database (useful for tests).
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
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(lower(email));

            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
            ",
        )
        .map_err(|e| HiveError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    /// Run a blocking closure against the SQLite connection on the Tokio
    /// blocking thread-pool.
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

    // ── users ──────────────────────────────────────────────────────────

    /// Insert a new account. Email uniqueness is case-insensitive; a
    /// duplicate surfaces as the same validation message the register
    /// endpoint returns for any other invalid field.
    pub async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> Result<User> {
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            let inserted = conn.execute(
                "INSERT INTO users (email, name, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![email, name, password_hash, created_at.to_rfc3339()],
            );
            match inserted {
                Ok(_) => Ok(User {
                    id: conn.last_insert_rowid(),
                    email,
                    name,
                    password_hash,
                    created_at,
                }),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(HiveError::InvalidInput(
                        "Email has already been taken".to_string(),
                    ))
                }
                Err(e) => Err(HiveError::Storage(format!("failed to insert user: {e}"))),
            }
        })
        .await
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, email, name, password_hash, created_at FROM users WHERE id = ?1",
                [id],
                row_to_user,
            )
            .optional()
            .map_err(|e| HiveError::Storage(format!("failed to load user: {e}")))
        })
        .await
    }

    pub async fn find_by_email(&self, email: String) -> Result<Option<User>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, email, name, password_hash, created_at FROM users \
                 WHERE lower(email) = lower(?1)",
                [email],
                row_to_user,
            )
            .optional()
            .map_err(|e| HiveError::Storage(format!("failed to look up user by email: {e}")))
        })
        .await
    }

    // ── sessions ───────────────────────────────────────────────────────

    pub async fn insert_session(&self, session: Session) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, expires_at, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    session.token,
                    session.user_id,
                    session.expires_at.to_rfc3339(),
                    session.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| HiveError::Storage(format!("failed to insert session: {e}")))?;
            Ok(())
        })
        .await
    }

    pub async fn find_session(&self, token: String) -> Result<Option<Session>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT token, user_id, expires_at, created_at FROM sessions WHERE token = ?1",
                [token],
                row_to_session,
            )
            .optional()
            .map_err(|e| HiveError::Storage(format!("failed to load session: {e}")))
        })
        .await
    }

    /// Delete a session by token. Deleting a token that is already gone is
    /// not an error.
    pub async fn delete_session(&self, token: String) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", [token])
                .map_err(|e| HiveError::Storage(format!("failed to delete session: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Drop every session a user holds. Login calls this first so each
    /// account has at most one live session.
    pub async fn destroy_sessions_for_user(&self, user_id: i64) -> Result<usize> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM sessions WHERE user_id = ?1", [user_id])
                .map_err(|e| HiveError::Storage(format!("failed to destroy sessions: {e}")))
        })
        .await
    }

    /// Slide a session's expiry forward. No-op if the token vanished in
    /// the meantime.
    pub async fn extend_session(&self, token: String, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE sessions SET expires_at = ?1 WHERE token = ?2",
                rusqlite::params![expires_at.to_rfc3339(), token],
            )
            .map_err(|e| HiveError::Storage(format!("failed to extend session: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Delete every session whose expiry is at or before `now`. Returns
    /// the number of rows removed.
    pub async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                [now.to_rfc3339()],
            )
            .map_err(|e| HiveError::Storage(format!("failed to clean up sessions: {e}")))
        })
        .await
    }

    /// Cheap liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| HiveError::Storage(format!("database ping failed: {e}")))
        })
        .await
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_ts(row, 4)?,
    })
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        token: row.get(0)?,
        user_id: row.get(1)?,
        expires_at: parse_ts(row, 2)?,
        created_at: parse_ts(row, 3)?,
    })
}

fn parse_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

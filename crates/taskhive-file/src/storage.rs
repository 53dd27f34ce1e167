use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use taskhive_core::model::{FileAttachment, FileCategory};
use taskhive_core::{HiveError, Result};

/// SQLite-backed store for attachment metadata and upload categories. The
/// service tracks metadata only; file bytes live elsewhere.
pub struct FileStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl FileStore {
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
            CREATE TABLE IF NOT EXISTS file_categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                allowed_file_types TEXT NOT NULL DEFAULT '[]',
                max_file_size INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_file_categories_name
                ON file_categories(lower(name));

            CREATE TABLE IF NOT EXISTS file_attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                original_filename TEXT NOT NULL,
                storage_filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_url TEXT NOT NULL,
                user_id INTEGER,
                category_id INTEGER REFERENCES file_categories(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_file_attachments_user_id
                ON file_attachments(user_id);
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

    // ── categories ─────────────────────────────────────────────────────

    pub async fn insert_category(&self, mut category: FileCategory) -> Result<FileCategory> {
        self.with_conn(move |conn| {
            let allowed = serde_json::to_string(&category.allowed_file_types)?;
            let inserted = conn.execute(
                "INSERT INTO file_categories \
                 (name, description, allowed_file_types, max_file_size, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    category.name,
                    category.description,
                    allowed,
                    category.max_file_size,
                    category.created_at.to_rfc3339(),
                ],
            );
            match inserted {
                Ok(_) => {
                    category.id = conn.last_insert_rowid();
                    Ok(category)
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(HiveError::InvalidInput("has already been taken".to_string()))
                }
                Err(e) => Err(HiveError::Storage(format!("failed to insert category: {e}"))),
            }
        })
        .await
    }

    pub async fn list_categories(&self) -> Result<Vec<FileCategory>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_CATEGORY} ORDER BY name"))
                .map_err(|e| HiveError::Storage(format!("failed to prepare query: {e}")))?;
            let rows = stmt
                .query_map([], row_to_category)
                .map_err(|e| HiveError::Storage(format!("failed to list categories: {e}")))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| HiveError::Storage(format!("failed to read category row: {e}")))
        })
        .await
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<FileCategory>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{SELECT_CATEGORY} WHERE id = ?1"),
                [id],
                row_to_category,
            )
            .optional()
            .map_err(|e| HiveError::Storage(format!("failed to load category: {e}")))
        })
        .await
    }

    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let deleted = conn
                .execute("DELETE FROM file_categories WHERE id = ?1", [id])
                .map_err(|e| HiveError::Storage(format!("failed to delete category: {e}")))?;
            Ok(deleted > 0)
        })
        .await
    }

    // ── attachments ────────────────────────────────────────────────────

    pub async fn insert_attachment(&self, mut file: FileAttachment) -> Result<FileAttachment> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO file_attachments \
                 (original_filename, storage_filename, content_type, file_size, file_url, \
                  user_id, category_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    file.original_filename,
                    file.storage_filename,
                    file.content_type,
                    file.file_size,
                    file.file_url,
                    file.user_id,
                    file.category_id,
                    file.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| HiveError::Storage(format!("failed to insert attachment: {e}")))?;
            file.id = conn.last_insert_rowid();
            Ok(file)
        })
        .await
    }

    /// All attachments, or one user's, newest first.
    pub async fn list_attachments(&self, user_id: Option<i64>) -> Result<Vec<FileAttachment>> {
        self.with_conn(move |conn| {
            let (sql, params) = match user_id {
                Some(id) => (
                    format!("{SELECT_ATTACHMENT} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"),
                    vec![id],
                ),
                None => (
                    format!("{SELECT_ATTACHMENT} ORDER BY created_at DESC, id DESC"),
                    vec![],
                ),
            };
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| HiveError::Storage(format!("failed to prepare query: {e}")))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), row_to_attachment)
                .map_err(|e| HiveError::Storage(format!("failed to list attachments: {e}")))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| HiveError::Storage(format!("failed to read attachment row: {e}")))
        })
        .await
    }

    pub async fn get_attachment(&self, id: i64) -> Result<Option<FileAttachment>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{SELECT_ATTACHMENT} WHERE id = ?1"),
                [id],
                row_to_attachment,
            )
            .optional()
            .map_err(|e| HiveError::Storage(format!("failed to load attachment: {e}")))
        })
        .await
    }

    pub async fn delete_attachment(&self, id: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let deleted = conn
                .execute("DELETE FROM file_attachments WHERE id = ?1", [id])
                .map_err(|e| HiveError::Storage(format!("failed to delete attachment: {e}")))?;
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

const SELECT_CATEGORY: &str = "SELECT id, name, description, allowed_file_types, max_file_size, \
                               created_at FROM file_categories";

const SELECT_ATTACHMENT: &str = "SELECT id, original_filename, storage_filename, content_type, \
                                 file_size, file_url, user_id, category_id, created_at \
                                 FROM file_attachments";

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileCategory> {
    let allowed_raw: String = row.get(3)?;
    let allowed_file_types = serde_json::from_str(&allowed_raw)
        .map_err(|e| conversion_error(3, e.to_string()))?;
    Ok(FileCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        allowed_file_types,
        max_file_size: row.get(4)?,
        created_at: parse_ts(row, 5)?,
    })
}

fn row_to_attachment(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileAttachment> {
    Ok(FileAttachment {
        id: row.get(0)?,
        original_filename: row.get(1)?,
        storage_filename: row.get(2)?,
        content_type: row.get(3)?,
        file_size: row.get(4)?,
        file_url: row.get(5)?,
        user_id: row.get(6)?,
        category_id: row.get(7)?,
        created_at: parse_ts(row, 8)?,
    })
}

fn parse_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e.to_string()))
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

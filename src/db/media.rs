use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::media::{Media, MediaRepository};

#[derive(Debug, Clone, Default)]
pub struct CreateMediaInput {
    pub base_path: String,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[derive(Debug, Error)]
pub enum MediaRepoError {
    #[error("media not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    db_path: PathBuf,
}

impl MediaStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub fn initialize(&self) -> Result<(), MediaRepoError> {
        self.with_connection(|_| Ok(()))
    }

    fn with_connection<T, F>(&self, func: F) -> Result<T, MediaRepoError>
    where
        F: FnOnce(&Connection) -> Result<T, MediaRepoError>,
    {
        if let Some(parent) = self.db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(self.db_path.as_path())?;
        ensure_schema(&conn)?;
        func(&conn)
    }
}

impl MediaStore {
    pub fn create_media(&self, input: CreateMediaInput) -> Result<Media, MediaRepoError> {
        self.with_connection(|conn| {
            let filename = input.filename.trim().to_string();
            if filename.is_empty() {
                return Err(MediaRepoError::Validation(String::from(
                    "Field 'filename' is required",
                )));
            }
            if !is_plain_file_name(filename.as_str()) {
                return Err(MediaRepoError::Validation(String::from(
                    "Field 'filename' must not contain path separators",
                )));
            }
            let base_path = input.base_path.trim().trim_matches('/').to_string();
            if !is_relative_path(base_path.as_str()) {
                return Err(MediaRepoError::Validation(String::from(
                    "Field 'base_path' must be a relative path without '..'",
                )));
            }

            let id = Uuid::new_v4().to_string();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "
                INSERT INTO media
                  (id, base_path, filename, mime_type, size, width, height, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                ",
                params![
                    id,
                    base_path,
                    filename,
                    input.mime_type.trim(),
                    input.size,
                    input.width,
                    input.height,
                    now
                ],
            )?;

            fetch_media_by_id(conn, id.as_str())?.ok_or(MediaRepoError::NotFound)
        })
    }

    pub fn get_media(&self, id: &str) -> Result<Option<Media>, MediaRepoError> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        self.with_connection(|conn| fetch_media_by_id(conn, id))
    }
}

impl MediaRepository for MediaStore {
    fn find_media(&self, id: &str) -> Result<Option<Media>, MediaRepoError> {
        self.get_media(id)
    }
}

fn ensure_schema(conn: &Connection) -> Result<(), MediaRepoError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS media (
          id TEXT PRIMARY KEY,
          base_path TEXT NOT NULL DEFAULT '',
          filename TEXT NOT NULL,
          mime_type TEXT NOT NULL DEFAULT '',
          size INTEGER NOT NULL DEFAULT 0,
          width INTEGER,
          height INTEGER,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

fn fetch_media_by_id(conn: &Connection, id: &str) -> Result<Option<Media>, MediaRepoError> {
    Ok(conn
        .query_row(
            "
            SELECT id, base_path, filename, mime_type, size, width, height, created_at, updated_at
            FROM media
            WHERE id = ?1
            ",
            [id],
            media_from_row,
        )
        .optional()?)
}

fn media_from_row(row: &Row<'_>) -> rusqlite::Result<Media> {
    Ok(Media {
        id: row.get("id")?,
        base_path: row.get("base_path")?,
        filename: row.get("filename")?,
        mime_type: row.get("mime_type")?,
        size: row.get("size")?,
        width: row.get("width")?,
        height: row.get("height")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn is_plain_file_name(value: &str) -> bool {
    !value.contains('/') && !value.contains('\\') && value != "." && value != ".."
}

fn is_relative_path(value: &str) -> bool {
    Path::new(value)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

pub mod media;

use std::path::{Path, PathBuf};

pub const DEFAULT_MEDIA_DB_PATH: &str = "var/backend/media.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub app_db_path: PathBuf,
}

impl DbConfig {
    pub fn new(app_db_path: impl Into<PathBuf>) -> Self {
        Self {
            app_db_path: app_db_path.into(),
        }
    }
}

pub fn resolve_db_config(app_root: &Path) -> DbConfig {
    let sqlite_path = std::env::var("MEDIA_BACKEND_DB").ok();
    select_db_config(sqlite_path.as_deref(), app_root)
}

fn select_db_config(sqlite_path: Option<&str>, app_root: &Path) -> DbConfig {
    let sqlite_raw = sqlite_path
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| String::from(DEFAULT_MEDIA_DB_PATH));
    let sqlite_candidate = PathBuf::from(sqlite_raw);
    let sqlite_abs = if sqlite_candidate.is_absolute() {
        sqlite_candidate
    } else {
        app_root.join(sqlite_candidate)
    };
    DbConfig::new(sqlite_abs)
}

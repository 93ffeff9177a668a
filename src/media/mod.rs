use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::media::MediaRepoError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    pub base_path: String,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Media {
    /// Location of the original file relative to the media filesystem root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.base_path.as_str()).join(self.filename.as_str())
    }
}

pub trait MediaRepository: Send + Sync + 'static {
    fn find_media(&self, id: &str) -> Result<Option<Media>, MediaRepoError>;
}

pub type SharedMediaRepository = Arc<dyn MediaRepository>;

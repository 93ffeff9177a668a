use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::command::{ImageEditorExecutor, SharedCommandExecutor};
use crate::config::{MediaConfig, MediaConfigError};
use crate::db::media::{MediaRepoError, MediaStore};
use crate::editor::EditorService;
use crate::filesystem::MEDIA_FILESYSTEM;
use crate::image_definition::ImageDefinitionError;
use crate::media::SharedMediaRepository;

pub const EDITOR_PATH: &str = "/api/media/editor";
pub const IMAGE_DEFINITIONS_PATH: &str = "/api/media/image-definitions";

#[derive(Clone)]
pub struct AppState {
    pub service_name: &'static str,
    pub service_version: &'static str,
    pub started_unix_ms: u128,
    pub editor: EditorService,
}

impl AppState {
    pub fn new(editor: EditorService) -> Self {
        Self {
            service_name: "media-editor-core",
            service_version: env!("CARGO_PKG_VERSION"),
            started_unix_ms: now_unix_ms(),
            editor,
        }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] MediaConfigError),
    #[error(transparent)]
    ImageDefinition(#[from] ImageDefinitionError),
    #[error("media store failed to initialize: {0}")]
    MediaStore(#[from] MediaRepoError),
}

/// Wires the editor from configuration using the SQLite media store and the
/// image-crate executor.
pub fn build_editor_service(config: &MediaConfig) -> Result<EditorService, BootstrapError> {
    let store = MediaStore::new(config.db.app_db_path.clone());
    store.initialize()?;
    let media: SharedMediaRepository = Arc::new(store);
    let executor: SharedCommandExecutor = Arc::new(ImageEditorExecutor::new());
    build_editor_service_with(config, media, executor)
}

pub fn build_editor_service_with(
    config: &MediaConfig,
    media: SharedMediaRepository,
    executor: SharedCommandExecutor,
) -> Result<EditorService, BootstrapError> {
    let registry = config.image_definition_configurator()?.build()?;
    let filesystems = config.filesystem_manager();
    if !filesystems.has(MEDIA_FILESYSTEM) {
        warn!(
            filesystem = MEDIA_FILESYSTEM,
            "media filesystem is not configured; editor requests will fail"
        );
    }
    info!(
        image_definitions = registry.len(),
        filesystems = ?filesystems.names(),
        "image editor bootstrapped"
    );
    Ok(EditorService::new(
        media,
        Arc::new(registry),
        Arc::new(filesystems),
        executor,
    ))
}

pub fn build_router(editor: EditorService) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            EDITOR_PATH,
            post(crate::api::editor::edit_image_handler),
        )
        .route(
            IMAGE_DEFINITIONS_PATH,
            get(crate::api::editor::list_image_definitions_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(editor))
}

pub async fn serve(config: MediaConfig) -> Result<(), Box<dyn std::error::Error>> {
    let editor = build_editor_service(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    let app = build_router(editor);
    info!(bind = %config.bind, "starting media-editor-core HTTP surface");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn default_app_root() -> PathBuf {
    let fallback = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    fallback.canonicalize().unwrap_or(fallback)
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "status": "ok",
            "service": state.service_name,
            "version": state.service_version,
            "started_unix_ms": state.started_unix_ms,
            "image_definition_count": state.editor.image_definitions().len(),
        })),
    )
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis())
}

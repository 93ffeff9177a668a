use axum::body::Bytes;
use axum::extract::State;
use serde::Serialize;

use crate::api::handler_utils::{edit_failure_response, internal_error};
use crate::api::response::{success, success_with, ApiJson};
use crate::api::server::AppState;
use crate::editor::EditOutcome;
use crate::image_definition::ImageDefinition;

#[derive(Debug, Clone, Serialize)]
struct ImageDefinitionListResponse {
    count: usize,
    image_definitions: Vec<ImageDefinition>,
}

pub async fn edit_image_handler(State(state): State<AppState>, body: Bytes) -> ApiJson {
    let editor = state.editor.clone();
    let result = tokio::task::spawn_blocking(move || editor.edit_raw(body.as_ref())).await;

    match result {
        Ok(Ok(EditOutcome::Success)) => success(),
        Ok(Ok(EditOutcome::Failure(failure))) => edit_failure_response(failure),
        Ok(Err(error)) => internal_error(format!("image editor is misconfigured: {error}")),
        Err(join_error) => internal_error(format!("image edit task failed: {join_error}")),
    }
}

pub async fn list_image_definitions_handler(State(state): State<AppState>) -> ApiJson {
    let image_definitions = state
        .editor
        .image_definitions()
        .iter()
        .cloned()
        .collect::<Vec<_>>();
    success_with(ImageDefinitionListResponse {
        count: image_definitions.len(),
        image_definitions,
    })
}

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::api::error::ErrorKind;
use crate::api::response::{failure, ApiJson};
use crate::editor::{EditFailure, EditFailureKind};

pub fn edit_failure_response(edit_failure: EditFailure) -> ApiJson {
    let status = match edit_failure.kind {
        EditFailureKind::NotFound => StatusCode::NOT_FOUND,
        EditFailureKind::Input | EditFailureKind::Executor => StatusCode::BAD_REQUEST,
    };
    failure(
        status,
        ErrorKind::from(edit_failure.kind),
        edit_failure.code,
        edit_failure.messages,
    )
}

pub fn internal_error(message: impl Into<String>) -> ApiJson {
    let detail = message.into();
    error!(detail = %detail, "internal api error");
    failure(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Infra,
        "internal_error",
        vec![String::from("Internal server error")],
    )
}

pub fn into_json(payload: impl Serialize) -> Json<Value> {
    Json(serde_json::to_value(payload).expect("api payload should serialize"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::{edit_failure_response, internal_error};
    use crate::editor::{EditFailure, EditFailureKind};

    #[test]
    fn not_found_failures_map_to_404() {
        let (status, payload) = edit_failure_response(EditFailure {
            kind: EditFailureKind::NotFound,
            code: String::from("media_not_found"),
            messages: vec![String::from("Given Media Id does not exist")],
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload.0["success"], json!(false));
        assert_eq!(payload.0["error"], json!("media_not_found"));
        assert_eq!(payload.0["error_kind"], json!("not_found"));
    }

    #[test]
    fn executor_failures_keep_messages() {
        let (status, payload) = edit_failure_response(EditFailure {
            kind: EditFailureKind::Executor,
            code: String::from("media-media-delete"),
            messages: vec![String::from("disk full")],
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload.0["messages"], json!(["disk full"]));
        assert_eq!(payload.0["error_kind"], json!("executor"));
    }

    #[test]
    fn internal_errors_are_sanitized() {
        let (status, payload) = internal_error("sensitive detail");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload.0["success"], json!(false));
        assert_eq!(payload.0["error"], json!("internal_error"));
        assert_eq!(payload.0["messages"], json!(["Internal server error"]));
        assert_eq!(payload.0["error_kind"], json!("infra"));
    }
}

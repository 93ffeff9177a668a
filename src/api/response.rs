use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::error::{ApiError, ErrorKind};
use crate::api::handler_utils::into_json;

pub type ApiJson = (StatusCode, Json<Value>);

pub fn success() -> ApiJson {
    (StatusCode::OK, Json(json!({ "success": true })))
}

/// Success response carrying `payload`'s fields next to `"success": true`.
pub fn success_with<T>(payload: T) -> ApiJson
where
    T: Serialize,
{
    let Json(mut value) = into_json(payload);
    if let Some(object) = value.as_object_mut() {
        object.insert(String::from("success"), Value::Bool(true));
    }
    (StatusCode::OK, Json(value))
}

pub fn failure(
    status: StatusCode,
    kind: ErrorKind,
    code: impl Into<String>,
    messages: Vec<String>,
) -> ApiJson {
    (status, into_json(ApiError::new(kind, code, messages)))
}

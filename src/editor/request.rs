use serde_json::{Map, Value};
use thiserror::Error;

use crate::command::CropParameter;

pub const ID_FIELD: &str = "id";
pub const IMAGE_DEFINITION_FIELD: &str = "imageDefinition";
pub const CROP_FIELD: &str = "crop";

#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub media_id: String,
    pub image_definition: String,
    pub crop: CropParameter,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditRequestError {
    #[error("No parameters passed to editor")]
    EmptyBody,
    #[error("Request data needs to be a JSON object: {0}")]
    MalformedJson(String),
    #[error("Field '{0}' is required")]
    MissingField(&'static str),
    #[error("Field '{field}' is invalid: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl EditRequestError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyBody => "no_parameters_passed_to_editor",
            Self::MalformedJson(_) => "data_need_to_be_json",
            Self::MissingField(_) => "missing_parameter",
            Self::InvalidField { .. } => "invalid_parameter",
        }
    }
}

/// Turns a raw editor request body into an [`EditRequest`].
///
/// Checks run in a fixed order: empty body, JSON object, then the `id`,
/// `imageDefinition` and `crop` fields.
pub fn parse_edit_request(raw: &[u8]) -> Result<EditRequest, EditRequestError> {
    if raw.is_empty() {
        return Err(EditRequestError::EmptyBody);
    }

    let value = serde_json::from_slice::<Value>(raw)
        .map_err(|error| EditRequestError::MalformedJson(error.to_string()))?;
    let object = value.as_object().ok_or_else(|| {
        EditRequestError::MalformedJson(String::from("top-level value is not an object"))
    })?;

    let id = required(object, ID_FIELD)?;
    let image_definition = required(object, IMAGE_DEFINITION_FIELD)?;
    let crop = required(object, CROP_FIELD)?;

    Ok(EditRequest {
        media_id: parse_media_id(id)?,
        image_definition: parse_image_definition_name(image_definition)?,
        crop: parse_crop(crop)?,
    })
}

fn required<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, EditRequestError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(EditRequestError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn parse_media_id(value: &Value) -> Result<String, EditRequestError> {
    let id = match value {
        Value::String(raw) => raw.trim().to_string(),
        Value::Number(number) if number.is_i64() || number.is_u64() => number.to_string(),
        _ => {
            return Err(invalid(ID_FIELD, "expected a string or integer identifier"));
        }
    };
    if id.is_empty() {
        return Err(invalid(ID_FIELD, "must not be empty"));
    }
    Ok(id)
}

fn parse_image_definition_name(value: &Value) -> Result<String, EditRequestError> {
    let name = value
        .as_str()
        .map(str::trim)
        .ok_or_else(|| invalid(IMAGE_DEFINITION_FIELD, "expected a string"))?;
    if name.is_empty() {
        return Err(invalid(IMAGE_DEFINITION_FIELD, "must not be empty"));
    }
    Ok(name.to_string())
}

fn parse_crop(value: &Value) -> Result<CropParameter, EditRequestError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(CROP_FIELD, "expected an object with x, y, width, height"))?;
    let number = |key: &str| -> Result<f64, EditRequestError> {
        object
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(CROP_FIELD, format!("'{key}' must be a number").as_str()))
    };

    let crop = CropParameter {
        x: number("x")?,
        y: number("y")?,
        width: number("width")?,
        height: number("height")?,
    };
    if crop.x < 0.0 || crop.y < 0.0 {
        return Err(invalid(CROP_FIELD, "'x' and 'y' must not be negative"));
    }
    if crop.width <= 0.0 || crop.height <= 0.0 {
        return Err(invalid(CROP_FIELD, "'width' and 'height' must be positive"));
    }
    Ok(crop)
}

fn invalid(field: &'static str, message: &str) -> EditRequestError {
    EditRequestError::InvalidField {
        field,
        message: message.to_string(),
    }
}

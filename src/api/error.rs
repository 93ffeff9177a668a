use serde::Serialize;

use crate::editor::EditFailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Executor,
    Infra,
}

impl From<EditFailureKind> for ErrorKind {
    fn from(kind: EditFailureKind) -> Self {
        match kind {
            EditFailureKind::Input => Self::Validation,
            EditFailureKind::NotFound => Self::NotFound,
            EditFailureKind::Executor => Self::Executor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub error_kind: ErrorKind,
    pub messages: Vec<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            success: false,
            error: code.into(),
            error_kind: kind,
            messages,
        }
    }
}

pub mod request;
pub mod service;

pub use request::{parse_edit_request, EditRequest, EditRequestError};
pub use service::{EditFailure, EditFailureKind, EditOutcome, EditorConfigError, EditorService};

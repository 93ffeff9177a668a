use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::request::{parse_edit_request, EditRequest};
use crate::command::{EditorCommand, SharedCommandExecutor};
use crate::db::media::MediaRepoError;
use crate::filesystem::{FilesystemManager, MEDIA_FILESYSTEM};
use crate::image_definition::{ImageDefinitionRegistry, SharedImageDefinitionRegistry};
use crate::media::SharedMediaRepository;

pub const MEDIA_NOT_FOUND_CODE: &str = "media_not_found";
pub const MEDIA_NOT_FOUND_MESSAGE: &str = "Given Media Id does not exist";
pub const IMAGE_DEFINITION_NOT_FOUND_CODE: &str = "image_definition_not_found";
pub const IMAGE_DEFINITION_NOT_FOUND_MESSAGE: &str = "Given ImageDefinition does not exist";
pub const EDITOR_COMMAND_FAILED_CODE: &str = "media-media-delete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditFailureKind {
    Input,
    NotFound,
    Executor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditFailure {
    pub kind: EditFailureKind,
    pub code: String,
    pub messages: Vec<String>,
}

impl EditFailure {
    fn new(kind: EditFailureKind, code: &str, messages: Vec<String>) -> Self {
        Self {
            kind,
            code: code.to_string(),
            messages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Success,
    Failure(EditFailure),
}

/// Misconfiguration that prevents serving any edit request.
#[derive(Debug, Error)]
pub enum EditorConfigError {
    #[error("filesystem '{0}' is not configured")]
    FilesystemNotConfigured(String),
    #[error("media repository failed: {0}")]
    Repository(#[from] MediaRepoError),
}

#[derive(Clone)]
pub struct EditorService {
    media: SharedMediaRepository,
    image_definitions: SharedImageDefinitionRegistry,
    filesystems: Arc<FilesystemManager>,
    executor: SharedCommandExecutor,
}

impl EditorService {
    pub fn new(
        media: SharedMediaRepository,
        image_definitions: SharedImageDefinitionRegistry,
        filesystems: Arc<FilesystemManager>,
        executor: SharedCommandExecutor,
    ) -> Self {
        Self {
            media,
            image_definitions,
            filesystems,
            executor,
        }
    }

    pub fn image_definitions(&self) -> &ImageDefinitionRegistry {
        self.image_definitions.as_ref()
    }

    /// Parses `raw` and handles it; parse errors become input failures.
    pub fn edit_raw(&self, raw: &[u8]) -> Result<EditOutcome, EditorConfigError> {
        match parse_edit_request(raw) {
            Ok(request) => self.handle(&request),
            Err(error) => {
                debug!(error = %error, "rejected editor request");
                Ok(EditOutcome::Failure(EditFailure::new(
                    EditFailureKind::Input,
                    error.code(),
                    vec![error.to_string()],
                )))
            }
        }
    }

    pub fn handle(&self, request: &EditRequest) -> Result<EditOutcome, EditorConfigError> {
        let Some(media) = self.media.find_media(request.media_id.as_str())? else {
            return Ok(not_found(MEDIA_NOT_FOUND_CODE, MEDIA_NOT_FOUND_MESSAGE));
        };

        let Ok(image_definition) = self
            .image_definitions
            .get(request.image_definition.as_str())
        else {
            return Ok(not_found(
                IMAGE_DEFINITION_NOT_FOUND_CODE,
                IMAGE_DEFINITION_NOT_FOUND_MESSAGE,
            ));
        };

        let filesystem = self
            .filesystems
            .get(MEDIA_FILESYSTEM)
            .cloned()
            .ok_or_else(|| EditorConfigError::FilesystemNotConfigured(MEDIA_FILESYSTEM.to_string()))?;

        let command = EditorCommand {
            media,
            image_definition,
            crop: request.crop,
            filesystem,
        };
        let result = self.executor.execute(&command);
        if !result.successful {
            warn!(
                media_id = %command.media.id,
                image_definition = %command.image_definition.name,
                messages = ?result.messages,
                "editor command failed"
            );
            return Ok(EditOutcome::Failure(EditFailure::new(
                EditFailureKind::Executor,
                EDITOR_COMMAND_FAILED_CODE,
                result.messages,
            )));
        }

        Ok(EditOutcome::Success)
    }
}

fn not_found(code: &str, message: &str) -> EditOutcome {
    EditOutcome::Failure(EditFailure::new(
        EditFailureKind::NotFound,
        code,
        vec![message.to_string()],
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::command::{CommandExecutor, CommandResult, CropParameter};
    use crate::filesystem::Filesystem;
    use crate::image_definition::{ImageDefinition, ImageDefinitionMode};
    use crate::media::{Media, MediaRepository};

    #[derive(Default)]
    struct FakeMediaRepository {
        media: HashMap<String, Media>,
        fail: bool,
    }

    impl MediaRepository for FakeMediaRepository {
        fn find_media(&self, id: &str) -> Result<Option<Media>, MediaRepoError> {
            if self.fail {
                return Err(MediaRepoError::Validation(String::from("boom")));
            }
            Ok(self.media.get(id).cloned())
        }
    }

    struct FakeExecutor {
        result: CommandResult,
        seen: Mutex<Vec<(String, String, CropParameter, String)>>,
    }

    impl FakeExecutor {
        fn returning(result: CommandResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().expect("lock poisoned").len()
        }
    }

    impl CommandExecutor for FakeExecutor {
        fn execute(&self, command: &EditorCommand) -> CommandResult {
            self.seen.lock().expect("lock poisoned").push((
                command.media.id.clone(),
                command.image_definition.name.clone(),
                command.crop,
                command.filesystem.name.clone(),
            ));
            self.result.clone()
        }
    }

    fn media(id: &str) -> Media {
        Media {
            id: id.to_string(),
            base_path: String::from("uploads"),
            filename: String::from("photo.jpg"),
            mime_type: String::from("image/jpeg"),
            size: 1,
            width: None,
            height: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn registry() -> SharedImageDefinitionRegistry {
        let mut registry = ImageDefinitionRegistry::new();
        registry
            .register(
                ImageDefinition::new("thumb", Some(100), Some(100), ImageDefinitionMode::FitCrop)
                    .expect("definition should build"),
            )
            .expect("registration should succeed");
        Arc::new(registry)
    }

    fn service_with(
        repo: FakeMediaRepository,
        filesystems: FilesystemManager,
        executor: Arc<FakeExecutor>,
    ) -> EditorService {
        EditorService::new(Arc::new(repo), registry(), Arc::new(filesystems), executor)
    }

    fn default_service(executor: Arc<FakeExecutor>) -> EditorService {
        let mut repo = FakeMediaRepository::default();
        repo.media.insert(String::from("m1"), media("m1"));
        service_with(
            repo,
            FilesystemManager::new([Filesystem::local(MEDIA_FILESYSTEM, "/srv/media")]),
            executor,
        )
    }

    fn request(media_id: &str, image_definition: &str) -> EditRequest {
        EditRequest {
            media_id: media_id.to_string(),
            image_definition: image_definition.to_string(),
            crop: CropParameter {
                x: 1.0,
                y: 2.0,
                width: 3.0,
                height: 4.0,
            },
        }
    }

    #[test]
    fn successful_command_returns_success() {
        let executor = FakeExecutor::returning(CommandResult::success());
        let service = default_service(executor.clone());

        let outcome = service.handle(&request("m1", "thumb")).expect("handle should succeed");
        assert_eq!(outcome, EditOutcome::Success);

        let seen = executor.seen.lock().expect("lock poisoned");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "m1");
        assert_eq!(seen[0].1, "thumb");
        assert_eq!(seen[0].2.width, 3.0);
        assert_eq!(seen[0].3, MEDIA_FILESYSTEM);
    }

    #[test]
    fn executor_messages_are_passed_through() {
        let executor =
            FakeExecutor::returning(CommandResult::failure(vec![String::from("disk full")]));
        let service = default_service(executor);

        let outcome = service.handle(&request("m1", "thumb")).expect("handle should succeed");
        assert_eq!(
            outcome,
            EditOutcome::Failure(EditFailure {
                kind: EditFailureKind::Executor,
                code: String::from(EDITOR_COMMAND_FAILED_CODE),
                messages: vec![String::from("disk full")],
            })
        );
    }

    #[test]
    fn missing_media_wins_over_missing_definition() {
        let executor = FakeExecutor::returning(CommandResult::success());
        let service = default_service(executor.clone());

        let outcome = service
            .handle(&request("nope", "also-nope"))
            .expect("handle should succeed");
        match outcome {
            EditOutcome::Failure(failure) => {
                assert_eq!(failure.kind, EditFailureKind::NotFound);
                assert_eq!(failure.code, MEDIA_NOT_FOUND_CODE);
                assert_eq!(failure.messages, vec![MEDIA_NOT_FOUND_MESSAGE.to_string()]);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(executor.calls(), 0);
    }

    #[test]
    fn unknown_image_definition_is_a_failure() {
        let executor = FakeExecutor::returning(CommandResult::success());
        let service = default_service(executor.clone());

        let outcome = service.handle(&request("m1", "poster")).expect("handle should succeed");
        match outcome {
            EditOutcome::Failure(failure) => {
                assert_eq!(failure.code, IMAGE_DEFINITION_NOT_FOUND_CODE);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(executor.calls(), 0);
    }

    #[test]
    fn missing_media_filesystem_is_a_configuration_error() {
        let executor = FakeExecutor::returning(CommandResult::success());
        let mut repo = FakeMediaRepository::default();
        repo.media.insert(String::from("m1"), media("m1"));
        let service = service_with(
            repo,
            FilesystemManager::new([Filesystem::local("private", "/srv/private")]),
            executor.clone(),
        );

        let err = service
            .handle(&request("m1", "thumb"))
            .expect_err("missing filesystem should fail");
        assert!(matches!(err, EditorConfigError::FilesystemNotConfigured(_)));
        assert_eq!(executor.calls(), 0);
    }

    #[test]
    fn repository_errors_are_not_user_failures() {
        let executor = FakeExecutor::returning(CommandResult::success());
        let service = service_with(
            FakeMediaRepository {
                fail: true,
                ..FakeMediaRepository::default()
            },
            FilesystemManager::new([Filesystem::local(MEDIA_FILESYSTEM, "/srv/media")]),
            executor,
        );
        let err = service
            .handle(&request("m1", "thumb"))
            .expect_err("repository error should surface");
        assert!(matches!(err, EditorConfigError::Repository(_)));
    }

    #[test]
    fn edit_raw_maps_parse_errors_to_input_failures() {
        let service = default_service(FakeExecutor::returning(CommandResult::success()));

        for (body, code) in [
            ("", "no_parameters_passed_to_editor"),
            ("{oops", "data_need_to_be_json"),
            (r#"{"id":"m1"}"#, "missing_parameter"),
        ] {
            match service.edit_raw(body.as_bytes()).expect("edit should not error") {
                EditOutcome::Failure(failure) => {
                    assert_eq!(failure.kind, EditFailureKind::Input);
                    assert_eq!(failure.code, code);
                }
                other => panic!("expected failure for {body:?}, got {other:?}"),
            }
        }
    }
}

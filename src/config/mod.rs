use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{resolve_db_config, DbConfig};
use crate::filesystem::{Filesystem, FilesystemManager, MEDIA_FILESYSTEM};
use crate::image_definition::{
    ImageDefinitionConfigurator, ImageDefinitionDirectory, ImageDefinitionError,
    ImageDefinitionSource,
};

pub const DEFAULT_BIND: &str = "127.0.0.1:8790";
pub const DEFAULT_SETTINGS_PATH: &str = "config/media.settings.toml";
pub const DEFAULT_MEDIA_ROOT: &str = "var/media";
pub const DEFAULT_IMAGE_DEFINITION_DIR: &str = "config/image-definitions";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MediaSettingsFile {
    #[serde(default)]
    filesystems: BTreeMap<String, FilesystemSettings>,
    #[serde(default)]
    image_definition: ImageDefinitionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilesystemSettings {
    root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImageDefinitionSettings {
    #[serde(default)]
    directories: Vec<ImageDefinitionDirectory>,
    #[serde(default)]
    definitions: Vec<ImageDefinitionSource>,
}

#[derive(Debug, Error)]
pub enum MediaConfigError {
    #[error("failed to read media settings '{path}': {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse media settings JSON '{path}': {message}")]
    ParseJson { path: String, message: String },
    #[error("failed to parse media settings TOML '{path}': {message}")]
    ParseToml { path: String, message: String },
    #[error("filesystem '{name}' is invalid: {message}")]
    InvalidFilesystem { name: String, message: String },
    #[error("invalid bind address '{value}': {message}")]
    InvalidBind { value: String, message: String },
    #[error(transparent)]
    ImageDefinition(#[from] ImageDefinitionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaConfigRequest {
    pub app_root: PathBuf,
    pub settings_path: Option<String>,
    pub bind: Option<String>,
    pub db: Option<DbConfig>,
}

/// Resolved backend configuration. Relative paths from the settings file
/// are already joined onto the app root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConfig {
    pub app_root: PathBuf,
    pub settings_path: PathBuf,
    pub settings_loaded: bool,
    pub bind: SocketAddr,
    pub db: DbConfig,
    pub filesystems: Vec<Filesystem>,
    pub image_definition_directories: Vec<ImageDefinitionDirectory>,
    image_definition_sources: Vec<ImageDefinitionSource>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MediaConfigSummary {
    pub settings_path: String,
    pub settings_loaded: bool,
    pub bind: String,
    pub db_path: String,
    pub filesystems: BTreeMap<String, String>,
    pub image_definitions: Vec<String>,
}

impl MediaConfig {
    pub fn filesystem_manager(&self) -> FilesystemManager {
        FilesystemManager::new(self.filesystems.iter().cloned())
    }

    pub fn image_definition_configurator(
        &self,
    ) -> Result<ImageDefinitionConfigurator, MediaConfigError> {
        let mut configurator = ImageDefinitionConfigurator::new();
        for directory in self.image_definition_directories.iter() {
            configurator.add_directory(directory.path.clone(), directory.recursive);
        }
        for source in self.image_definition_sources.iter() {
            configurator.add_image_definition(source.clone().into_definition("")?);
        }
        Ok(configurator)
    }
}

/// Environment-driven loading used by the binary: `MEDIA_SETTINGS`,
/// `MEDIA_BACKEND_BIND` and `MEDIA_BACKEND_DB` override the defaults.
pub fn load_media_config_from_env(
    app_root: &Path,
    settings_override: Option<String>,
) -> Result<MediaConfig, MediaConfigError> {
    let settings_path = settings_override.or_else(|| std::env::var("MEDIA_SETTINGS").ok());
    let bind = std::env::var("MEDIA_BACKEND_BIND").ok();
    load_media_config(&MediaConfigRequest {
        app_root: app_root.to_path_buf(),
        settings_path,
        bind,
        db: Some(resolve_db_config(app_root)),
    })
}

pub fn load_media_config(req: &MediaConfigRequest) -> Result<MediaConfig, MediaConfigError> {
    let app_root = req.app_root.as_path();
    let settings_path = req
        .settings_path
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| resolve_path(app_root, Path::new(v)))
        .unwrap_or_else(|| app_root.join(DEFAULT_SETTINGS_PATH));

    let settings = load_settings_file(settings_path.as_path())?;
    let settings_loaded = settings.is_some();
    let settings = settings.unwrap_or_else(|| default_settings(app_root));

    let bind_raw = req
        .bind
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_BIND);
    let bind = bind_raw
        .parse::<SocketAddr>()
        .map_err(|error| MediaConfigError::InvalidBind {
            value: bind_raw.to_string(),
            message: error.to_string(),
        })?;

    let mut filesystems = Vec::with_capacity(settings.filesystems.len());
    for (name, fs_settings) in settings.filesystems {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(MediaConfigError::InvalidFilesystem {
                name,
                message: String::from("name must not be empty"),
            });
        }
        if fs_settings.root.as_os_str().is_empty() {
            return Err(MediaConfigError::InvalidFilesystem {
                name,
                message: String::from("root must not be empty"),
            });
        }
        filesystems.push(Filesystem::local(
            name,
            resolve_path(app_root, fs_settings.root.as_path()),
        ));
    }

    let image_definition_directories = settings
        .image_definition
        .directories
        .into_iter()
        .map(|dir| ImageDefinitionDirectory {
            path: resolve_path(app_root, dir.path.as_path()),
            recursive: dir.recursive,
        })
        .collect();

    Ok(MediaConfig {
        app_root: app_root.to_path_buf(),
        settings_path,
        settings_loaded,
        bind,
        db: req
            .db
            .clone()
            .unwrap_or_else(|| DbConfig::new(app_root.join(crate::db::DEFAULT_MEDIA_DB_PATH))),
        filesystems,
        image_definition_directories,
        image_definition_sources: settings.image_definition.definitions,
    })
}

pub fn summarize_media_config(
    config: &MediaConfig,
    image_definitions: Vec<String>,
) -> MediaConfigSummary {
    MediaConfigSummary {
        settings_path: config.settings_path.display().to_string(),
        settings_loaded: config.settings_loaded,
        bind: config.bind.to_string(),
        db_path: config.db.app_db_path.display().to_string(),
        filesystems: config
            .filesystems
            .iter()
            .map(|fs| (fs.name.clone(), fs.root.display().to_string()))
            .collect(),
        image_definitions,
    }
}

fn default_settings(app_root: &Path) -> MediaSettingsFile {
    let mut filesystems = BTreeMap::new();
    filesystems.insert(
        MEDIA_FILESYSTEM.to_string(),
        FilesystemSettings {
            root: PathBuf::from(DEFAULT_MEDIA_ROOT),
        },
    );
    let mut directories = Vec::new();
    if app_root.join(DEFAULT_IMAGE_DEFINITION_DIR).is_dir() {
        directories.push(ImageDefinitionDirectory {
            path: PathBuf::from(DEFAULT_IMAGE_DEFINITION_DIR),
            recursive: true,
        });
    }
    MediaSettingsFile {
        filesystems,
        image_definition: ImageDefinitionSettings {
            directories,
            definitions: Vec::new(),
        },
    }
}

fn load_settings_file(path: &Path) -> Result<Option<MediaSettingsFile>, MediaConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|error| MediaConfigError::ReadFile {
        path: path.display().to_string(),
        message: error.to_string(),
    })?;

    let is_json = path
        .extension()
        .and_then(|v| v.to_str())
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let parsed = if is_json {
        serde_json::from_str::<MediaSettingsFile>(raw.as_str()).map_err(|error| {
            MediaConfigError::ParseJson {
                path: path.display().to_string(),
                message: error.to_string(),
            }
        })?
    } else {
        toml::from_str::<MediaSettingsFile>(raw.as_str()).map_err(|error| {
            MediaConfigError::ParseToml {
                path: path.display().to_string(),
                message: error.to_string(),
            }
        })?
    };
    Ok(Some(parsed))
}

fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    fn temp_root() -> PathBuf {
        let root = std::env::temp_dir().join(format!("media_config_test_{}", Uuid::new_v4()));
        fs::create_dir_all(root.join("config")).expect("temp root should be creatable");
        root
    }

    #[test]
    fn missing_settings_file_yields_defaults() {
        let root = temp_root();
        let config = load_media_config(&MediaConfigRequest {
            app_root: root.clone(),
            ..MediaConfigRequest::default()
        })
        .expect("defaults should load");

        assert!(!config.settings_loaded);
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(
            config.filesystems,
            vec![Filesystem::local(MEDIA_FILESYSTEM, root.join("var/media"))]
        );
        assert!(config.image_definition_directories.is_empty());
        assert_eq!(config.db.app_db_path, root.join("var/backend/media.db"));
    }

    #[test]
    fn default_definition_directory_is_used_when_present() {
        let root = temp_root();
        fs::create_dir_all(root.join(DEFAULT_IMAGE_DEFINITION_DIR)).expect("dir should create");
        let config = load_media_config(&MediaConfigRequest {
            app_root: root.clone(),
            ..MediaConfigRequest::default()
        })
        .expect("defaults should load");
        assert_eq!(
            config.image_definition_directories,
            vec![ImageDefinitionDirectory {
                path: root.join(DEFAULT_IMAGE_DEFINITION_DIR),
                recursive: true,
            }]
        );
    }

    #[test]
    fn toml_settings_resolve_relative_paths() {
        let root = temp_root();
        fs::write(
            root.join(DEFAULT_SETTINGS_PATH),
            r#"
[filesystems.media]
root = "storage/media"

[filesystems.private]
root = "/srv/private"

[[image_definition.directories]]
path = "definitions"
recursive = false

[[image_definition.definitions]]
name = "admin-thumb"
width = 150
height = 150
mode = "fitCrop"
"#,
        )
        .expect("settings should write");

        let config = load_media_config(&MediaConfigRequest {
            app_root: root.clone(),
            bind: Some(String::from("0.0.0.0:9000")),
            ..MediaConfigRequest::default()
        })
        .expect("settings should load");

        assert!(config.settings_loaded);
        assert_eq!(config.bind.to_string(), "0.0.0.0:9000");
        assert_eq!(
            config.filesystems,
            vec![
                Filesystem::local("media", root.join("storage/media")),
                Filesystem::local("private", "/srv/private"),
            ]
        );
        assert_eq!(
            config.image_definition_directories,
            vec![ImageDefinitionDirectory {
                path: root.join("definitions"),
                recursive: false,
            }]
        );

        fs::create_dir_all(root.join("definitions")).expect("dir should create");
        let registry = config
            .image_definition_configurator()
            .expect("configurator should build")
            .build()
            .expect("registry should build");
        assert_eq!(registry.names(), vec![String::from("admin-thumb")]);
    }

    #[test]
    fn json_settings_are_selected_by_extension() {
        let root = temp_root();
        let path = root.join("config/media.settings.json");
        fs::write(path.as_path(), r#"{"filesystems":{"media":{"root":"m"}}}"#)
            .expect("settings should write");

        let config = load_media_config(&MediaConfigRequest {
            app_root: root.clone(),
            settings_path: Some(String::from("config/media.settings.json")),
            ..MediaConfigRequest::default()
        })
        .expect("json settings should load");
        assert_eq!(config.settings_path, path);
        assert_eq!(config.filesystem_manager().names(), vec![String::from("media")]);
    }

    #[test]
    fn unknown_keys_and_bad_bind_are_errors() {
        let root = temp_root();
        fs::write(root.join(DEFAULT_SETTINGS_PATH), "[filesystem.media]\nroot = \"x\"\n")
            .expect("settings should write");
        let err = load_media_config(&MediaConfigRequest {
            app_root: root.clone(),
            ..MediaConfigRequest::default()
        })
        .expect_err("typo table should fail");
        assert!(matches!(err, MediaConfigError::ParseToml { .. }));

        let err = load_media_config(&MediaConfigRequest {
            app_root: temp_root(),
            bind: Some(String::from("localhost")),
            ..MediaConfigRequest::default()
        })
        .expect_err("bad bind should fail");
        assert!(matches!(err, MediaConfigError::InvalidBind { .. }));
    }

    #[test]
    fn inline_definitions_without_name_are_rejected() {
        let root = temp_root();
        fs::write(
            root.join(DEFAULT_SETTINGS_PATH),
            "[[image_definition.definitions]]\nwidth = 10\n",
        )
        .expect("settings should write");
        let config = load_media_config(&MediaConfigRequest {
            app_root: root,
            ..MediaConfigRequest::default()
        })
        .expect("settings should load");
        let err = config
            .image_definition_configurator()
            .expect_err("nameless definition should fail");
        assert!(matches!(
            err,
            MediaConfigError::ImageDefinition(ImageDefinitionError::Invalid { .. })
        ));
    }
}

pub mod configurator;
pub mod registry;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use configurator::{ImageDefinitionConfigurator, ImageDefinitionDirectory};
pub use registry::{ImageDefinitionRegistry, SharedImageDefinitionRegistry};

pub const IMAGE_DEFINITION_FILE_EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageDefinitionMode {
    #[default]
    #[serde(rename = "fit")]
    Fit,
    #[serde(rename = "fitCrop")]
    FitCrop,
    #[serde(rename = "canvas")]
    Canvas,
    #[serde(rename = "canvasFitCrop")]
    CanvasFitCrop,
}

impl ImageDefinitionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::FitCrop => "fitCrop",
            Self::Canvas => "canvas",
            Self::CanvasFitCrop => "canvasFitCrop",
        }
    }

    fn requires_both_dimensions(self) -> bool {
        !matches!(self, Self::Fit)
    }
}

/// A named rendering preset applied after an image has been cropped.
///
/// Definitions are immutable once registered and are shared behind `Arc`
/// by [`ImageDefinitionRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDefinition {
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mode: ImageDefinitionMode,
    pub upscale: bool,
    pub directory: String,
}

impl ImageDefinition {
    pub fn new(
        name: impl Into<String>,
        width: Option<u32>,
        height: Option<u32>,
        mode: ImageDefinitionMode,
    ) -> Result<Self, ImageDefinitionError> {
        let name = name.into();
        let directory = name.clone();
        Self {
            name,
            width,
            height,
            mode,
            upscale: false,
            directory,
        }
        .validated()
    }

    pub fn with_upscale(mut self, upscale: bool) -> Self {
        self.upscale = upscale;
        self
    }

    pub fn with_directory(
        mut self,
        directory: impl Into<String>,
    ) -> Result<Self, ImageDefinitionError> {
        self.directory = directory.into();
        self.validated()
    }

    fn validated(mut self) -> Result<Self, ImageDefinitionError> {
        self.name = self.name.trim().to_string();
        self.directory = self.directory.trim().to_string();
        let invalid = |message: &str| ImageDefinitionError::Invalid {
            name: self.name.clone(),
            message: message.to_string(),
        };

        if !is_safe_identifier(self.name.as_str()) {
            return Err(invalid(
                "name must be non-empty and use only letters, digits, '-' or '_'",
            ));
        }
        if !is_safe_identifier(self.directory.as_str()) {
            return Err(invalid(
                "directory must be non-empty and use only letters, digits, '-' or '_'",
            ));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(invalid("width and height must be greater than zero"));
        }
        if self.width.is_none() && self.height.is_none() {
            return Err(invalid("at least one of width, height is required"));
        }
        if self.mode.requires_both_dimensions() && (self.width.is_none() || self.height.is_none())
        {
            return Err(invalid(
                format!("mode '{}' requires both width and height", self.mode.as_str()).as_str(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageDefinitionError {
    #[error("image definition directory '{path}' does not exist or is not a directory")]
    InvalidDirectory { path: String },
    #[error("failed to read image definition '{path}': {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse image definition '{path}': {message}")]
    Parse { path: String, message: String },
    #[error("image definition '{name}' is invalid: {message}")]
    Invalid { name: String, message: String },
    #[error("image definition '{name}' is registered more than once")]
    Duplicate { name: String },
    #[error("image definition '{0}' does not exist")]
    NotFound(String),
}

/// Serialized form of a definition, as found in definition files and in the
/// `[[image_definition.definitions]]` settings table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageDefinitionSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub mode: ImageDefinitionMode,
    #[serde(default)]
    pub upscale: bool,
    #[serde(default)]
    pub directory: Option<String>,
}

impl ImageDefinitionSource {
    pub fn into_definition(
        self,
        default_name: &str,
    ) -> Result<ImageDefinition, ImageDefinitionError> {
        let name = self
            .name
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default_name.to_string());
        let directory = self
            .directory
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| name.clone());

        ImageDefinition {
            name,
            width: self.width,
            height: self.height,
            mode: self.mode,
            upscale: self.upscale,
            directory,
        }
        .validated()
    }
}

/// Reads one definition file. The file stem is the name unless the file sets
/// `name` explicitly.
pub fn load_image_definition_file(path: &Path) -> Result<ImageDefinition, ImageDefinitionError> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|error| ImageDefinitionError::ReadFile {
        path: display.clone(),
        message: error.to_string(),
    })?;
    let parse_error = |message: String| ImageDefinitionError::Parse {
        path: display.clone(),
        message,
    };

    let parsed = match extension_lowercase(path).as_deref() {
        Some("toml") => toml::from_str::<ImageDefinitionSource>(raw.as_str())
            .map_err(|error| parse_error(error.to_string()))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str::<ImageDefinitionSource>(raw.as_str())
            .map_err(|error| parse_error(error.to_string()))?,
        _ => serde_json::from_str::<ImageDefinitionSource>(raw.as_str())
            .map_err(|error| parse_error(error.to_string()))?,
    };

    let stem = path
        .file_stem()
        .and_then(|v| v.to_str())
        .unwrap_or_default();
    parsed.into_definition(stem)
}

pub fn is_image_definition_file(path: &Path) -> bool {
    extension_lowercase(path)
        .map(|ext| IMAGE_DEFINITION_FILE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|v| v.to_str())
        .map(|v| v.to_ascii_lowercase())
}

fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

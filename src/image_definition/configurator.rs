use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ImageDefinition, ImageDefinitionError, ImageDefinitionRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDefinitionDirectory {
    pub path: PathBuf,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_recursive() -> bool {
    true
}

/// Collects definition sources during bootstrap and turns them into a
/// read-only [`ImageDefinitionRegistry`].
#[derive(Debug, Clone, Default)]
pub struct ImageDefinitionConfigurator {
    directories: Vec<ImageDefinitionDirectory>,
    definitions: Vec<ImageDefinition>,
}

impl ImageDefinitionConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directory(&mut self, directory: impl Into<PathBuf>, recursive: bool) -> &mut Self {
        self.directories.push(ImageDefinitionDirectory {
            path: directory.into(),
            recursive,
        });
        self
    }

    pub fn add_image_definition(&mut self, definition: ImageDefinition) -> &mut Self {
        self.definitions.push(definition);
        self
    }

    pub fn build(&self) -> Result<ImageDefinitionRegistry, ImageDefinitionError> {
        let mut registry = ImageDefinitionRegistry::new();
        for directory in self.directories.iter() {
            let loaded = registry.register_directory(directory.path.as_path(), directory.recursive)?;
            info!(
                directory = %directory.path.display(),
                recursive = directory.recursive,
                loaded,
                "loaded image definitions"
            );
        }
        for definition in self.definitions.iter() {
            registry.register(definition.clone())?;
        }
        Ok(registry)
    }
}

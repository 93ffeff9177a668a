use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use super::{
    is_image_definition_file, load_image_definition_file, ImageDefinition, ImageDefinitionError,
};

pub type SharedImageDefinitionRegistry = Arc<ImageDefinitionRegistry>;

/// Name-keyed lookup of image definitions.
///
/// Populated during bootstrap (see [`super::ImageDefinitionConfigurator`]) and
/// only read afterwards, so a built registry can be shared across request
/// handlers without locking.
#[derive(Debug, Clone, Default)]
pub struct ImageDefinitionRegistry {
    definitions: BTreeMap<String, Arc<ImageDefinition>>,
}

impl ImageDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every definition file found in `directory`. Sub-directories are
    /// only visited when `recursive` is set.
    pub fn register_directory(
        &mut self,
        directory: &Path,
        recursive: bool,
    ) -> Result<usize, ImageDefinitionError> {
        if !directory.is_dir() {
            return Err(ImageDefinitionError::InvalidDirectory {
                path: directory.display().to_string(),
            });
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(directory)
            .follow_links(true)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|error| ImageDefinitionError::ReadFile {
                path: error
                    .path()
                    .unwrap_or(directory)
                    .display()
                    .to_string(),
                message: error.to_string(),
            })?;
            if entry.file_type().is_file() && is_image_definition_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        for path in files.iter() {
            let definition = load_image_definition_file(path.as_path())?;
            debug!(
                name = %definition.name,
                path = %path.display(),
                "registered image definition"
            );
            self.register(definition)?;
        }
        Ok(files.len())
    }

    pub fn register(&mut self, definition: ImageDefinition) -> Result<(), ImageDefinitionError> {
        match self.definitions.entry(definition.name.clone()) {
            Entry::Occupied(existing) => Err(ImageDefinitionError::Duplicate {
                name: existing.key().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(definition));
                Ok(())
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<ImageDefinition>, ImageDefinitionError> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| ImageDefinitionError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageDefinition> {
        self.definitions.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

pub const MEDIA_FILESYSTEM: &str = "media";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filesystem {
    pub name: String,
    pub root: PathBuf,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilesystemError {
    #[error("path '{path}' escapes filesystem '{filesystem}'")]
    PathEscapesRoot { filesystem: String, path: String },
}

impl Filesystem {
    pub fn local(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Joins `relative` onto the root. Absolute paths and `..` are rejected.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> Result<PathBuf, FilesystemError> {
        let relative = relative.as_ref();
        let mut out = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(FilesystemError::PathEscapesRoot {
                        filesystem: self.name.clone(),
                        path: relative.display().to_string(),
                    });
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilesystemManager {
    filesystems: BTreeMap<String, Filesystem>,
}

impl FilesystemManager {
    pub fn new(filesystems: impl IntoIterator<Item = Filesystem>) -> Self {
        Self {
            filesystems: filesystems
                .into_iter()
                .map(|fs| (fs.name.clone(), fs))
                .collect(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.filesystems.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Filesystem> {
        self.filesystems.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.filesystems.keys().cloned().collect()
    }
}

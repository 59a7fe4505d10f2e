//! Filesystem-backed library tree.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::application::source::{LibrarySource, SourceError};

/// Library versions stored below a root directory.
#[derive(Debug, Clone)]
pub struct FsLibrary {
    root: PathBuf,
}

impl FsLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a library-relative path below the root.
    fn resolve(&self, relative: &Path) -> Result<PathBuf, SourceError> {
        if relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(SourceError::InvalidPath {
                path: relative.to_path_buf(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl LibrarySource for FsLibrary {
    async fn read_to_string(&self, path: &Path) -> Result<String, SourceError> {
        let absolute = self.resolve(path)?;
        match fs::read_to_string(&absolute).await {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(SourceError::NotFound {
                path: path.to_path_buf(),
            }),
            Err(err) => Err(SourceError::Io {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }
}

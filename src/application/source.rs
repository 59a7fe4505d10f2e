//! Read access to the library tree.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("`{}` does not exist", path.display())]
    NotFound { path: PathBuf },
    #[error("`{}` is not a path inside the library", path.display())]
    InvalidPath { path: PathBuf },
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Text files of the library, addressed relative to the versions root.
#[async_trait]
pub trait LibrarySource: Send + Sync {
    async fn read_to_string(&self, path: &Path) -> Result<String, SourceError>;
}

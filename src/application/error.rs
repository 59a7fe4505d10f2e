use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{domain::error::DomainError, infra::error::InfraError};

use super::source::SourceError;

/// Why a build could not produce a bundle.
///
/// Clone so a single failed resolution can be handed to every caller waiting
/// on it.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("library file `{}` not found", path.display())]
    NotFound { path: PathBuf },
    #[error("Could not find module with name {name}")]
    ModuleNotFound { name: String },
    #[error("failed to parse `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("preset `{}` is invalid: {reason}", path.display())]
    InvalidPreset { path: PathBuf, reason: String },
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
}

impl BuildError {
    pub fn parse(path: PathBuf, source: serde_json::Error) -> Self {
        Self::Parse {
            path,
            source: Arc::new(source),
        }
    }

    /// Map a failed module read, naming the module when its source is missing.
    pub fn from_module_read(name: &str, error: SourceError) -> Self {
        match error {
            SourceError::NotFound { .. } => Self::ModuleNotFound {
                name: name.to_string(),
            },
            other => other.into(),
        }
    }
}

impl From<SourceError> for BuildError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::NotFound { path } => Self::NotFound { path },
            SourceError::InvalidPath { path } => Self::Io {
                source: Arc::new(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path escapes the library root",
                )),
                path,
            },
            SourceError::Io { path, source } => Self::Io {
                path,
                source: Arc::new(source),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Error response carrying a JSON `{"error": ...}` payload.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: String,
    report: ErrorReport,
}

impl HttpError {
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message }));
        let mut response = (self.status, body).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<BuildError> for HttpError {
    fn from(error: BuildError) -> Self {
        let status = match error {
            BuildError::Domain(DomainError::InvalidName { .. }) => StatusCode::BAD_REQUEST,
            BuildError::NotFound { .. }
            | BuildError::ModuleNotFound { .. }
            | BuildError::Parse { .. }
            | BuildError::InvalidPreset { .. }
            | BuildError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpError::from_error(
            "application::error::build_error_to_http_error",
            status,
            error.to_string(),
            &error,
        )
    }
}

/// Process-level failure reported by the binary before exiting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

use std::fmt;

use thiserror::Error;

/// Which part of a build request a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Version,
    Preset,
    Module,
}

impl NameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NameKind::Version => "version",
            NameKind::Preset => "preset",
            NameKind::Module => "module",
        }
    }
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {kind} name `{name}`: {reason}")]
    InvalidName {
        kind: NameKind,
        name: String,
        reason: &'static str,
    },
}

impl DomainError {
    pub fn invalid_name(kind: NameKind, name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName {
            kind,
            name: name.into(),
            reason,
        }
    }
}

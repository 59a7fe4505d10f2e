//! Library layout and build request types.
//!
//! A library is a tree of versions. Each version directory holds a header set
//! (listed by a loader manifest), a directory of presets and one directory per
//! module:
//!
//! ```text
//! <version>/<headers>/loader.json
//! <version>/<presets>/<preset>.json
//! <version>/<modules>/<module>/module.js
//! ```
//!
//! Paths produced here are relative to the versions root; the filesystem adapter
//! resolves them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{DomainError, NameKind};

/// Version served when a caller does not name one.
pub const DEFAULT_VERSION: &str = "v1";
/// Manifest listing the header files of a version, in order.
pub const HEADER_MANIFEST: &str = "loader.json";
/// Source file inside each module directory.
pub const MODULE_SOURCE: &str = "module.js";
/// Extension of preset definition files.
pub const PRESET_EXTENSION: &str = "json";
/// Separator placed between concatenated sources.
pub const JOIN_SEPARATOR: &str = "\n";

const DEFAULT_HEADER_DIRECTORY: &str = "headers";
const DEFAULT_MODULE_DIRECTORY: &str = "modules";
const DEFAULT_PRESET_DIRECTORY: &str = "presets";

/// Directory names used inside every version directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    pub header_directory: PathBuf,
    pub module_directory: PathBuf,
    pub preset_directory: PathBuf,
}

impl Default for LibraryLayout {
    fn default() -> Self {
        Self {
            header_directory: PathBuf::from(DEFAULT_HEADER_DIRECTORY),
            module_directory: PathBuf::from(DEFAULT_MODULE_DIRECTORY),
            preset_directory: PathBuf::from(DEFAULT_PRESET_DIRECTORY),
        }
    }
}

impl LibraryLayout {
    pub fn version_base(&self, version: &str) -> PathBuf {
        PathBuf::from(version)
    }

    pub fn header_manifest(&self, version_base: &Path) -> PathBuf {
        version_base
            .join(&self.header_directory)
            .join(HEADER_MANIFEST)
    }

    pub fn header_file(&self, version_base: &Path, name: &str) -> PathBuf {
        version_base.join(&self.header_directory).join(name)
    }

    pub fn preset_file(&self, version_base: &Path, preset: &str) -> PathBuf {
        version_base
            .join(&self.preset_directory)
            .join(format!("{preset}.{PRESET_EXTENSION}"))
    }

    pub fn module_source(&self, version_base: &Path, module: &str) -> PathBuf {
        version_base
            .join(&self.module_directory)
            .join(module)
            .join(MODULE_SOURCE)
    }
}

/// Check that a version, preset or module name is a single plain path segment.
pub fn validate_name(kind: NameKind, name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::invalid_name(kind, name, "name is empty"));
    }
    if name == "." || name == ".." {
        return Err(DomainError::invalid_name(
            kind,
            name,
            "relative directory names are not allowed",
        ));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(DomainError::invalid_name(
            kind,
            name,
            "name must not contain path separators",
        ));
    }
    Ok(())
}

/// A request for one library bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    version: String,
    preset: Option<String>,
    modules: Vec<String>,
}

impl Default for BuildRequest {
    /// Headers of the baseline version only.
    fn default() -> Self {
        Self::new(DEFAULT_VERSION)
    }
}

impl BuildRequest {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            preset: None,
            modules: Vec::new(),
        }
    }

    /// Select a preset. An empty name means no preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        let preset = preset.into();
        self.preset = (!preset.is_empty()).then_some(preset);
        self
    }

    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn preset(&self) -> Option<&str> {
        self.preset.as_deref()
    }

    /// Preset name as it takes part in the build key; empty when absent.
    pub fn preset_name(&self) -> &str {
        self.preset.as_deref().unwrap_or("")
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(NameKind::Version, &self.version)?;
        if let Some(preset) = self.preset.as_deref() {
            validate_name(NameKind::Preset, preset)?;
        }
        for module in &self.modules {
            validate_name(NameKind::Module, module)?;
        }
        Ok(())
    }
}

/// Result of a build: the bundle text and whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub source: Arc<str>,
    pub cached: bool,
}

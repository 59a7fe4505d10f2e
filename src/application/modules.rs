//! Module resolution.
//!
//! Preset modules come first, followed by requested modules not already
//! present. Sources are read in that order and joined; the first missing
//! module aborts the resolution.

use std::path::Path;
use std::sync::Arc;

use crate::domain::error::NameKind;
use crate::domain::library::{JOIN_SEPARATOR, LibraryLayout, validate_name};
use crate::domain::module_set::ModuleSet;

use super::error::BuildError;
use super::presets::PresetResolver;
use super::source::LibrarySource;

#[derive(Clone)]
pub struct ModuleResolver {
    source: Arc<dyn LibrarySource>,
    layout: Arc<LibraryLayout>,
    presets: PresetResolver,
}

impl ModuleResolver {
    pub fn new(source: Arc<dyn LibrarySource>, layout: Arc<LibraryLayout>) -> Self {
        let presets = PresetResolver::new(Arc::clone(&source), Arc::clone(&layout));
        Self {
            source,
            layout,
            presets,
        }
    }

    /// Ordered, duplicate-free module list for a request.
    ///
    /// Requested names are checked here. Preset entries are checked when the
    /// preset is parsed.
    pub async fn module_list(
        &self,
        version_base: &Path,
        preset: Option<&str>,
        extra: &[String],
    ) -> Result<ModuleSet, BuildError> {
        for name in extra {
            validate_name(NameKind::Module, name)?;
        }
        let preset_modules = self.presets.resolve(version_base, preset).await?;
        Ok(ModuleSet::merge(
            preset_modules.iter().map(String::as_str),
            extra.iter().map(String::as_str),
        ))
    }

    /// Joined source of every resolved module, or `None` when no module is
    /// selected.
    pub async fn resolve(
        &self,
        version_base: &Path,
        preset: Option<&str>,
        extra: &[String],
    ) -> Result<Option<String>, BuildError> {
        let modules = self.module_list(version_base, preset, extra).await?;
        if modules.is_empty() {
            return Ok(None);
        }

        let mut sources = Vec::with_capacity(modules.len());
        for name in modules.iter() {
            let path = self.layout.module_source(version_base, name);
            let source = self
                .source
                .read_to_string(&path)
                .await
                .map_err(|err| BuildError::from_module_read(name, err))?;
            sources.push(source);
        }

        Ok(Some(sources.join(JOIN_SEPARATOR)))
    }
}

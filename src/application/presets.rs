//! Preset definitions: named, ordered module lists.

use std::path::Path;
use std::sync::Arc;

use crate::domain::error::NameKind;
use crate::domain::library::{LibraryLayout, validate_name};

use super::error::BuildError;
use super::source::LibrarySource;

#[derive(Clone)]
pub struct PresetResolver {
    source: Arc<dyn LibrarySource>,
    layout: Arc<LibraryLayout>,
}

impl PresetResolver {
    pub fn new(source: Arc<dyn LibrarySource>, layout: Arc<LibraryLayout>) -> Self {
        Self { source, layout }
    }

    /// Module names listed by `preset`, in file order.
    ///
    /// No preset yields an empty list. A named preset without a definition file
    /// is an error, and so is a definition listing a name that is not a plain
    /// module name.
    pub async fn resolve(
        &self,
        version_base: &Path,
        preset: Option<&str>,
    ) -> Result<Vec<String>, BuildError> {
        let Some(preset) = preset.filter(|name| !name.is_empty()) else {
            return Ok(Vec::new());
        };

        let path = self.layout.preset_file(version_base, preset);
        let definition = self.source.read_to_string(&path).await?;
        let modules: Vec<String> =
            serde_json::from_str(&definition).map_err(|err| BuildError::parse(path.clone(), err))?;

        for module in &modules {
            validate_name(NameKind::Module, module).map_err(|err| BuildError::InvalidPreset {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        }
        Ok(modules)
    }
}

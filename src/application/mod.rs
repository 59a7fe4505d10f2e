//! Build engine: header loading, preset and module resolution, orchestration.

pub mod builder;
pub mod error;
pub mod headers;
pub mod modules;
pub mod presets;
pub mod source;

pub use builder::Builder;
pub use error::BuildError;
pub use source::{LibrarySource, SourceError};

//! Domain layer types and invariants.

pub mod error;
pub mod library;
pub mod module_set;

//! Cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

/// Build cache configuration from `modjulie.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries across headers and builds; `0` disables eviction.
    pub max_entries: usize,
    /// Let concurrent misses on one build key share a single resolution.
    pub dedupe_inflight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 0,
            dedupe_inflight: true,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries,
            dedupe_inflight: settings.dedupe_inflight,
        }
    }
}

impl CacheConfig {
    /// Entry bound for LRU eviction, or `None` when the store is unbounded.
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.max_entries)
    }
}

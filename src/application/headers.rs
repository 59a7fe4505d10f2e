//! Header set loading.
//!
//! The header set of a version is read once, joined, and kept in the cache
//! under the version's base path. Failed loads are not cached.

use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use metrics::counter;
use tracing::debug;

use crate::cache::{CacheKey, CacheStore, HeaderKey, InFlight};
use crate::domain::library::{JOIN_SEPARATOR, LibraryLayout};

use super::error::BuildError;
use super::source::LibrarySource;

const METRIC_HEADER_HIT_TOTAL: &str = "modjulie_header_cache_hit_total";
const METRIC_HEADER_MISS_TOTAL: &str = "modjulie_header_cache_miss_total";

#[derive(Clone)]
pub struct HeaderLoader {
    source: Arc<dyn LibrarySource>,
    layout: Arc<LibraryLayout>,
    store: Arc<CacheStore>,
    inflight: Arc<InFlight<HeaderKey, Arc<str>, BuildError>>,
}

impl HeaderLoader {
    pub fn new(
        source: Arc<dyn LibrarySource>,
        layout: Arc<LibraryLayout>,
        store: Arc<CacheStore>,
    ) -> Self {
        Self {
            source,
            layout,
            store,
            inflight: Arc::new(InFlight::new()),
        }
    }

    /// Joined header text for the version rooted at `version_base`.
    ///
    /// Concurrent loads of one version share a single read of its files.
    pub async fn load(&self, version_base: &Path) -> Result<Arc<str>, BuildError> {
        let key = HeaderKey::new(version_base);
        if let Some(cached) = self.store.get(&CacheKey::Header(key.clone())) {
            counter!(METRIC_HEADER_HIT_TOTAL).increment(1);
            return Ok(cached);
        }

        let loader = self.clone();
        let owned_key = key.clone();
        let (result, _) = self
            .inflight
            .run(key, move || loader.read_headers(owned_key).boxed())
            .await;
        result
    }

    async fn read_headers(self, key: HeaderKey) -> Result<Arc<str>, BuildError> {
        let cache_key = CacheKey::Header(key.clone());
        // A load that finished between the lookup and this start already stored the set.
        if let Some(cached) = self.store.get(&cache_key) {
            counter!(METRIC_HEADER_HIT_TOTAL).increment(1);
            return Ok(cached);
        }
        counter!(METRIC_HEADER_MISS_TOTAL).increment(1);

        let version_base = key.version_base();
        let manifest_path = self.layout.header_manifest(version_base);
        let manifest = self.source.read_to_string(&manifest_path).await?;
        let names: Vec<String> = serde_json::from_str(&manifest)
            .map_err(|err| BuildError::parse(manifest_path.clone(), err))?;

        let mut sources = Vec::with_capacity(names.len());
        for name in &names {
            let path = self.layout.header_file(version_base, name);
            sources.push(self.source.read_to_string(&path).await?);
        }

        let joined: Arc<str> = Arc::from(sources.join(JOIN_SEPARATOR));
        debug!(
            version_base = %version_base.display(),
            headers = names.len(),
            "loaded header set"
        );
        self.store.set(cache_key, Arc::clone(&joined));
        Ok(joined)
    }
}

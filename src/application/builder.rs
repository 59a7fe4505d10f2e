//! Bundle builder.
//!
//! A build is served from the cache when its key is present. Otherwise the
//! header set and the module sources are resolved together, joined, stored
//! under the build key and returned fresh.

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};

use crate::cache::{BuildKey, CacheConfig, CacheKey, CacheStore, InFlight, Participation};
use crate::domain::library::{BuildOutcome, BuildRequest, JOIN_SEPARATOR, LibraryLayout};

use super::error::BuildError;
use super::headers::HeaderLoader;
use super::modules::ModuleResolver;
use super::source::LibrarySource;

const METRIC_BUILD_HIT_TOTAL: &str = "modjulie_build_cache_hit_total";
const METRIC_BUILD_MISS_TOTAL: &str = "modjulie_build_cache_miss_total";
const METRIC_BUILD_FAILED_TOTAL: &str = "modjulie_build_failed_total";
const METRIC_BUILD_SHARED_TOTAL: &str = "modjulie_build_inflight_shared_total";
const METRIC_BUILD_MS: &str = "modjulie_build_ms";

/// Resolves and caches library bundles.
pub struct Builder {
    assembler: Assembler,
    store: Arc<CacheStore>,
    inflight: Option<InFlight<BuildKey, Arc<str>, BuildError>>,
}

/// Owned resolution state, cloned into each miss so it can be shared between
/// concurrent callers.
#[derive(Clone)]
struct Assembler {
    layout: Arc<LibraryLayout>,
    headers: HeaderLoader,
    modules: ModuleResolver,
    store: Arc<CacheStore>,
}

impl Builder {
    pub fn new(
        source: Arc<dyn LibrarySource>,
        layout: LibraryLayout,
        store: Arc<CacheStore>,
        config: &CacheConfig,
    ) -> Self {
        let layout = Arc::new(layout);
        let headers = HeaderLoader::new(
            Arc::clone(&source),
            Arc::clone(&layout),
            Arc::clone(&store),
        );
        let modules = ModuleResolver::new(source, Arc::clone(&layout));
        let inflight = config.dedupe_inflight.then(InFlight::new);

        Self {
            assembler: Assembler {
                layout,
                headers,
                modules,
                store: Arc::clone(&store),
            },
            store,
            inflight,
        }
    }

    /// Builder with a fresh, unbounded store.
    pub fn with_defaults(source: Arc<dyn LibrarySource>, layout: LibraryLayout) -> Self {
        let config = CacheConfig::default();
        Self::new(
            source,
            layout,
            Arc::new(CacheStore::new(&config)),
            &config,
        )
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Build the bundle for `request`, from the cache when possible.
    #[instrument(
        skip_all,
        fields(
            version = %request.version(),
            preset = %request.preset_name(),
            modules = request.modules().len()
        )
    )]
    pub async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, BuildError> {
        request.validate()?;

        let key = BuildKey::derive(
            request.version(),
            request.preset_name(),
            request.modules(),
        );
        if let Some(source) = self.store.get(&CacheKey::Build(key.clone())) {
            counter!(METRIC_BUILD_HIT_TOTAL).increment(1);
            debug!(cache = "build", outcome = "hit", key = %key, "serving cached build");
            return Ok(BuildOutcome {
                source,
                cached: true,
            });
        }

        counter!(METRIC_BUILD_MISS_TOTAL).increment(1);
        debug!(cache = "build", outcome = "miss", key = %key, "resolving build");

        let started_at = Instant::now();
        let result = match &self.inflight {
            Some(inflight) => {
                let assembler = self.assembler.clone();
                let owned_key = key.clone();
                let owned_request = request.clone();
                let (result, participation) = inflight
                    .run(key.clone(), move || {
                        assembler.assemble(owned_key, owned_request).boxed()
                    })
                    .await;
                if participation == Participation::Joined {
                    counter!(METRIC_BUILD_SHARED_TOTAL).increment(1);
                    debug!(key = %key, "joined in-flight build");
                }
                result
            }
            None => {
                self.assembler
                    .clone()
                    .assemble(key.clone(), request.clone())
                    .await
            }
        };

        match result {
            Ok(source) => {
                let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
                histogram!(METRIC_BUILD_MS).record(elapsed_ms);
                info!(key = %key, bytes = source.len(), elapsed_ms, "build completed");
                Ok(BuildOutcome {
                    source,
                    cached: false,
                })
            }
            Err(err) => {
                counter!(METRIC_BUILD_FAILED_TOTAL).increment(1);
                warn!(key = %key, error = %err, "build failed");
                Err(err)
            }
        }
    }
}

impl Assembler {
    async fn assemble(self, key: BuildKey, request: BuildRequest) -> Result<Arc<str>, BuildError> {
        let version_base = self.layout.version_base(request.version());

        let (headers, modules) = tokio::join!(
            self.headers.load(&version_base),
            self.modules
                .resolve(&version_base, request.preset(), request.modules()),
        );
        // A module failure takes precedence over a header failure.
        let modules = modules?;
        let headers = headers?;

        let source: Arc<str> = match modules {
            Some(modules) => Arc::from([&*headers, modules.as_str()].join(JOIN_SEPARATOR)),
            None => headers,
        };

        self.store.set(CacheKey::Build(key), Arc::clone(&source));
        Ok(source)
    }
}

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the build engine emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "modjulie_build_cache_hit_total",
            Unit::Count,
            "Total number of builds served from the cache."
        );
        describe_counter!(
            "modjulie_build_cache_miss_total",
            Unit::Count,
            "Total number of builds that had to be resolved."
        );
        describe_counter!(
            "modjulie_build_failed_total",
            Unit::Count,
            "Total number of builds that failed to resolve."
        );
        describe_counter!(
            "modjulie_build_inflight_shared_total",
            Unit::Count,
            "Total number of builds that joined an identical in-flight resolution."
        );
        describe_counter!(
            "modjulie_header_cache_hit_total",
            Unit::Count,
            "Total number of header set lookups served from the cache."
        );
        describe_counter!(
            "modjulie_header_cache_miss_total",
            Unit::Count,
            "Total number of header sets read from disk."
        );
        describe_counter!(
            "modjulie_cache_evict_total",
            Unit::Count,
            "Total number of cache entries evicted due to capacity."
        );
        describe_histogram!(
            "modjulie_build_ms",
            Unit::Milliseconds,
            "Build resolution latency in milliseconds."
        );
    });
}

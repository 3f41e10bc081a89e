use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the process-wide subscriber: filter, error spans, and one fmt layer
/// writing to stderr, which keeps command output on stdout machine-readable.
///
/// `RUST_LOG` directives, when present, replace the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(log_filter(logging.level, directives.as_deref()))
        .with(ErrorLayer::default())
        .with(stderr_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

fn log_filter(level: LevelFilter, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default())
}

fn stderr_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    match format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Compact => layer.compact().without_time().boxed(),
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "published_cache_local_hit_total",
            Unit::Count,
            "Total number of reads served by the in-process tier."
        );
        describe_counter!(
            "published_cache_distributed_hit_total",
            Unit::Count,
            "Total number of reads served by the distributed tier."
        );
        describe_counter!(
            "published_cache_miss_total",
            Unit::Count,
            "Total number of reads that ran a population."
        );
        describe_counter!(
            "published_cache_coalesced_total",
            Unit::Count,
            "Total number of reads that joined an in-flight population."
        );
        describe_counter!(
            "published_cache_local_evict_total",
            Unit::Count,
            "Total number of in-process tier evictions due to capacity."
        );
        describe_histogram!(
            "published_cache_populate_ms",
            Unit::Milliseconds,
            "Population latency in milliseconds."
        );
        describe_counter!(
            "published_cache_seeded_total",
            Unit::Count,
            "Total number of entries pinned by seeding."
        );
        describe_counter!(
            "published_cache_elements_cleared_total",
            Unit::Count,
            "Total number of elements-cache entries cleared by invalidation."
        );
        describe_counter!(
            "published_cache_notifications_total",
            Unit::Count,
            "Total number of lifecycle notifications dispatched."
        );
        describe_gauge!(
            "published_cache_notification_queue_len",
            Unit::Count,
            "Current number of notifications awaiting delivery."
        );
    });
}

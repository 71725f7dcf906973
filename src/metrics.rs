//! Metric name constants.

use std::time::Duration;

use anyhow::Context;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config;

pub const EVENTS_APPLIED: &str = "hermis.events.applied"; // Counter.
pub const EVENTS_DUPLICATE: &str = "hermis.events.duplicate"; // Counter.
pub const EVENTS_DROPPED: &str = "hermis.events.dropped"; // Counter.
pub const JOURNAL_LENGTH: &str = "hermis.journal.length"; // Gauge.

pub const LIVE_READ_FAILED: &str = "hermis.live.failed"; // Counter.
pub const LIVE_CACHE_HITS: &str = "hermis.live.cache_hits"; // Counter.

pub const READ_DEGRADED: &str = "hermis.read.degraded"; // Counter.

/// Must be ran exactly once on startup. This will declare all of the instruments for `metrics`.
pub fn setup(config: Option<&config::MetricConfig>) -> anyhow::Result<()> {
    describe_counter!(EVENTS_APPLIED, "Events folded into the index.");
    describe_counter!(
        EVENTS_DUPLICATE,
        "Events ignored because their log was already journaled."
    );
    describe_counter!(
        EVENTS_DROPPED,
        "Events that left the index untouched (unknown entity, illegal transition)."
    );
    describe_gauge!(JOURNAL_LENGTH, "The number of journaled events.");

    describe_counter!(LIVE_READ_FAILED, "Failed live contract reads.");
    describe_counter!(LIVE_CACHE_HITS, "Live reads served from the cache.");

    describe_counter!(
        READ_DEGRADED,
        "Read model sub-queries that failed and fell back to a default."
    );

    if let Some(config) = config {
        match config {
            config::MetricConfig::PrometheusPush(prometheus_config) => {
                PrometheusBuilder::new()
                    .with_push_gateway(
                        prometheus_config.url.clone(),
                        Duration::from_secs(10),
                        None,
                        None,
                    )
                    .context("failed to set up push gateway")?
                    .install()
                    .context("failed to install metrics exporter")?;
            }
        }
    }

    Ok(())
}

//! Telemetry sinks and Prometheus exposition.
//!
//! # Responsibilities
//! - Define the sink the proxy handler records into
//! - Register the two proxy series once, before traffic is served
//! - Render the text exposition for `/metrics`
//!
//! # Metrics
//! - `http_request_duration_seconds` (histogram): latency by inbound path
//! - `http_requests_total` (counter): requests by inbound path
//!
//! # Design Decisions
//! - The sink is owned and injected, not a global recorder
//! - Low-overhead metric updates (atomic operations)
//! - Default Prometheus latency buckets
//! - Histogram samples are drained by a periodic upkeep task, so memory
//!   stays bounded when `/metrics` is never scraped

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const PATH_LABEL: &str = "path";

/// Prometheus client default buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Receives one latency observation and one count per proxied request.
pub trait TelemetrySink: Send + Sync {
    fn observe(&self, path: &str, duration: Duration);
    fn increment(&self, path: &str);

    /// Text exposition of everything recorded, if this sink has one.
    fn render(&self) -> Option<String> {
        None
    }
}

/// Sink backed by a private Prometheus recorder.
pub struct PrometheusTelemetry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusTelemetry {
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), &DEFAULT_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_histogram!(REQUEST_DURATION, Unit::Seconds, "Duration of HTTP requests.");
            describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests.");
        });

        Ok(Self { recorder, handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Run recorder upkeep every `period` until `shutdown` fires.
    pub fn spawn_upkeep(&self, period: Duration, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => handle.run_upkeep(),
                    _ = shutdown.recv() => {
                        tracing::debug!("Metrics upkeep stopped");
                        break;
                    }
                }
            }
        })
    }
}

impl TelemetrySink for PrometheusTelemetry {
    fn observe(&self, path: &str, duration: Duration) {
        metrics::with_local_recorder(&self.recorder, || {
            histogram!(REQUEST_DURATION, PATH_LABEL => path.to_string()).record(duration.as_secs_f64());
        });
    }

    fn increment(&self, path: &str) {
        metrics::with_local_recorder(&self.recorder, || {
            counter!(REQUESTS_TOTAL, PATH_LABEL => path.to_string()).increment(1);
        });
    }

    fn render(&self) -> Option<String> {
        Some(self.handle.render())
    }
}

impl std::fmt::Debug for PrometheusTelemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusTelemetry").finish_non_exhaustive()
    }
}

/// Per-path aggregates kept by [`InMemoryTelemetry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathStats {
    pub count: u64,
    pub observations: Vec<Duration>,
}

/// Sink that keeps raw observations in memory.
#[derive(Debug, Default)]
pub struct InMemoryTelemetry {
    paths: DashMap<String, PathStats>,
}

impl InMemoryTelemetry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stats(&self, path: &str) -> PathStats {
        self.paths
            .get(path)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn count(&self, path: &str) -> u64 {
        self.stats(path).count
    }

    pub fn observation_count(&self, path: &str) -> usize {
        self.stats(path).observations.len()
    }
}

impl TelemetrySink for InMemoryTelemetry {
    fn observe(&self, path: &str, duration: Duration) {
        self.paths
            .entry(path.to_string())
            .or_default()
            .observations
            .push(duration);
    }

    fn increment(&self, path: &str) {
        self.paths.entry(path.to_string()).or_default().count += 1;
    }
}

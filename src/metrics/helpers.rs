//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    DISPATCH_REQUESTS_TOTAL, MULTICAST_LATENCY, SCHEDULER_RUNS_TOTAL, SCHEDULER_RUN_DURATION,
    TOKENS_DELIVERED_TOTAL, TOKENS_FAILED_TOTAL, TRANSPORT_CONFIGURED, TRANSPORT_ERRORS_TOTAL,
    UPTIME_SECONDS,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a dispatch request for an audience label
    pub fn record_request(audience: &str) {
        DISPATCH_REQUESTS_TOTAL.with_label_values(&[audience]).inc();
    }

    pub fn record_delivered(count: u64) {
        TOKENS_DELIVERED_TOTAL.inc_by(count);
    }

    pub fn record_failed(count: u64) {
        TOKENS_FAILED_TOTAL.inc_by(count);
    }

    pub fn record_transport_error() {
        TRANSPORT_ERRORS_TOTAL.inc();
    }

    pub fn record_latency(elapsed: Duration) {
        MULTICAST_LATENCY.observe(elapsed.as_secs_f64());
    }
}

/// Helper struct for recording scheduler metrics
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    /// Record a completed task run
    pub fn record_success(task: &str, elapsed: Duration) {
        SCHEDULER_RUNS_TOTAL.with_label_values(&[task, "success"]).inc();
        SCHEDULER_RUN_DURATION
            .with_label_values(&[task])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a failed task run
    pub fn record_failure(task: &str, elapsed: Duration) {
        SCHEDULER_RUNS_TOTAL.with_label_values(&[task, "error"]).inc();
        SCHEDULER_RUN_DURATION
            .with_label_values(&[task])
            .observe(elapsed.as_secs_f64());
    }
}

/// Helper struct for service-level gauges
pub struct ServiceMetrics;

impl ServiceMetrics {
    pub fn set_transport_configured(configured: bool) {
        TRANSPORT_CONFIGURED.set(if configured { 1 } else { 0 });
    }

    pub fn set_uptime(seconds: u64) {
        UPTIME_SECONDS.set(seconds as i64);
    }
}

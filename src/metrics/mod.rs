//! Prometheus metrics for the dispatch service.
//!
//! - Dispatch metrics (requests by audience, per-token outcomes, transport errors)
//! - Latency of multicast calls
//! - Scheduler task runs and durations
//! - Service state (transport configured, uptime)

mod helpers;

pub use helpers::{encode_metrics, DispatchMetrics, SchedulerMetrics, ServiceMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "push_dispatch";

lazy_static! {
    // ============================================================================
    // Dispatch Metrics
    // ============================================================================

    /// Dispatch requests by audience
    pub static ref DISPATCH_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_requests_total", METRIC_PREFIX),
        "Total dispatch requests by audience",
        &["audience"]
    ).unwrap();

    /// Tokens the transport reported as delivered
    pub static ref TOKENS_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_tokens_delivered_total", METRIC_PREFIX),
        "Total device tokens successfully delivered to"
    ).unwrap();

    /// Tokens the transport reported as failed
    pub static ref TOKENS_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_tokens_failed_total", METRIC_PREFIX),
        "Total device tokens the transport rejected"
    ).unwrap();

    /// Transport calls that failed as a whole
    pub static ref TRANSPORT_ERRORS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_transport_errors_total", METRIC_PREFIX),
        "Total transport calls that failed entirely"
    ).unwrap();

    /// Multicast latency (transport call only)
    pub static ref MULTICAST_LATENCY: Histogram = register_histogram!(
        format!("{}_multicast_latency_seconds", METRIC_PREFIX),
        "Multicast transport call latency in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // ============================================================================
    // Scheduler Metrics
    // ============================================================================

    /// Scheduled task runs by task and status
    pub static ref SCHEDULER_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_scheduler_runs_total", METRIC_PREFIX),
        "Total scheduled task runs",
        &["task", "status"]
    ).unwrap();

    /// Scheduled task run duration
    pub static ref SCHEDULER_RUN_DURATION: HistogramVec = register_histogram_vec!(
        format!("{}_scheduler_run_duration_seconds", METRIC_PREFIX),
        "Scheduled task run duration in seconds",
        &["task"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]
    ).unwrap();

    // ============================================================================
    // Service Metrics
    // ============================================================================

    /// Push transport status (1 = configured, 0 = unconfigured)
    pub static ref TRANSPORT_CONFIGURED: IntGauge = register_int_gauge!(
        format!("{}_transport_configured", METRIC_PREFIX),
        "Push transport status (1=configured, 0=unconfigured)"
    ).unwrap();

    /// Seconds since the service started
    pub static ref UPTIME_SECONDS: IntGauge = register_int_gauge!(
        format!("{}_uptime_seconds", METRIC_PREFIX),
        "Seconds since the service started"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        // lazy_static registers on first access
        TRANSPORT_CONFIGURED.set(1);

        let output = encode_metrics().unwrap();
        assert!(output.contains("push_dispatch_transport_configured"));
    }

    #[test]
    fn test_dispatch_metrics() {
        DISPATCH_REQUESTS_TOTAL.with_label_values(&["all_users"]).inc();
        TOKENS_DELIVERED_TOTAL.inc_by(2);
        TOKENS_FAILED_TOTAL.inc();
        MULTICAST_LATENCY.observe(0.2);
        // Just verify no panics
    }
}

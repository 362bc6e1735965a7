//! Controller metrics
//!
//! Prometheus counters and histograms for pod event handling and the
//! Service/Ingress operations it issues.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Controller metrics registry
    pub static ref CONTROLLER_METRICS_REGISTRY: Registry = Registry::new();

    /// Pod event handling duration
    static ref POD_RECONCILIATION_DURATION: HistogramVec = {
        let opts = HistogramOpts::new(
            "pod_reconciliation_duration_seconds",
            "Pod event reconciliation duration in seconds",
        );
        let histogram = HistogramVec::new(opts, &["namespace", "event"])
            .expect("Failed to create histogram");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(histogram.clone()))
            .expect("Failed to register histogram");
        histogram
    };

    /// Pod events handled, by outcome
    static ref POD_RECONCILIATIONS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "pod_reconciliations_total",
            "Total number of pod event reconciliations",
        );
        let counter = IntCounterVec::new(opts, &["namespace", "event", "result"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };

    /// Service/Ingress operations issued against the cluster
    static ref EXPOSURE_OPERATIONS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "exposure_operations_total",
            "Total number of Service and Ingress operations",
        );
        let counter = IntCounterVec::new(opts, &["kind", "operation", "result"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };
}

/// Record one handled pod event
pub fn record_pod_reconciliation(namespace: &str, event: &str, duration_secs: f64, result: &str) {
    POD_RECONCILIATION_DURATION
        .with_label_values(&[namespace, event])
        .observe(duration_secs);

    POD_RECONCILIATIONS_TOTAL
        .with_label_values(&[namespace, event, result])
        .inc();
}

/// Record one Service/Ingress operation
pub fn record_exposure_operation(kind: &str, operation: &str, result: &str) {
    EXPOSURE_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation, result])
        .inc();
}

/// Gather controller metrics in Prometheus text format
pub fn gather_controller_metrics() -> Result<String, String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = CONTROLLER_METRICS_REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert to UTF-8: {}", e))
}

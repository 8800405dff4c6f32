//! Prometheus metrics for chat-service.
//!
//! Provides HTTP and upstream-provider metrics for observability.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// HTTP metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Provider metrics
pub static UPSTREAM_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static UPSTREAM_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize all metrics. Later calls are no-ops.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }

    let registry = Registry::new();

    let http_requests_total = match IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    ) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create http_requests_total metric");
            return;
        }
    };

    let http_request_duration = match HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method", "path"],
    ) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create http_request_duration_seconds metric");
            return;
        }
    };

    let upstream_requests = match IntCounterVec::new(
        Opts::new(
            "chat_upstream_requests_total",
            "Total calls to the generation provider by outcome",
        ),
        &["model", "outcome"],
    ) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create chat_upstream_requests_total metric");
            return;
        }
    };

    let upstream_latency = match HistogramVec::new(
        HistogramOpts::new(
            "chat_upstream_latency_seconds",
            "Generation provider latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["model"],
    ) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create chat_upstream_latency_seconds metric");
            return;
        }
    };

    let registered = [
        registry.register(Box::new(http_requests_total.clone())),
        registry.register(Box::new(http_request_duration.clone())),
        registry.register(Box::new(upstream_requests.clone())),
        registry.register(Box::new(upstream_latency.clone())),
    ];
    if let Some(Err(e)) = registered.into_iter().find(Result::is_err) {
        tracing::error!(error = %e, "Failed to register metrics");
        return;
    }

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(http_requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(http_request_duration);
    let _ = UPSTREAM_REQUESTS_TOTAL.set(upstream_requests);
    let _ = UPSTREAM_LATENCY_SECONDS.set(upstream_latency);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

/// Record a completed HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        let status = status.to_string();
        counter
            .with_label_values(&[method, path, status.as_str()])
            .inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

/// Record one provider call and its outcome (`success` or a provider error kind).
pub fn record_upstream_call(model: &str, outcome: &str, duration_secs: f64) {
    if let Some(counter) = UPSTREAM_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[model, outcome]).inc();
    }
    if let Some(histogram) = UPSTREAM_LATENCY_SECONDS.get() {
        histogram.with_label_values(&[model]).observe(duration_secs);
    }
}

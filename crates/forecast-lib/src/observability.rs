//! Observability infrastructure for the forecast service
//!
//! Provides:
//! - Prometheus metrics (prediction latency and counts, errors, strategy loads)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for per-request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Histogram buckets for artifact loading (in seconds)
const LOAD_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ForecastMetricsInner> = OnceLock::new();

struct ForecastMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions: IntCounterVec,
    prediction_errors: IntCounterVec,
    strategy_load_seconds: HistogramVec,
    strategies_loaded: IntGaugeVec,
}

impl ForecastMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "forecast_prediction_latency_seconds",
                "Time spent preparing features and scoring one request",
                &["domain", "strategy"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions: register_int_counter_vec!(
                "forecast_predictions_total",
                "Total number of predictions served",
                &["domain", "strategy"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "forecast_prediction_errors_total",
                "Total number of failed prediction requests",
                &["domain", "kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            strategy_load_seconds: register_histogram_vec!(
                "forecast_strategy_load_duration_seconds",
                "Time spent loading strategy artifacts",
                &["domain", "strategy"],
                LOAD_BUCKETS.to_vec()
            )
            .expect("Failed to register strategy_load_duration_seconds"),

            strategies_loaded: register_int_gauge_vec!(
                "forecast_strategies_loaded",
                "Number of strategies whose artifacts are loaded",
                &["domain"]
            )
            .expect("Failed to register strategies_loaded"),
        }
    }
}

/// Forecast metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ForecastMetrics {
    inner: &'static ForecastMetricsInner,
}

impl Default for ForecastMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastMetrics {
    pub fn new() -> Self {
        Self {
            inner: GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new),
        }
    }

    pub fn observe_prediction(&self, domain: &str, strategy: &str, duration_secs: f64) {
        self.inner
            .prediction_latency_seconds
            .with_label_values(&[domain, strategy])
            .observe(duration_secs);
        self.inner
            .predictions
            .with_label_values(&[domain, strategy])
            .inc();
    }

    pub fn inc_prediction_errors(&self, domain: &str, kind: &str) {
        self.inner
            .prediction_errors
            .with_label_values(&[domain, kind])
            .inc();
    }

    pub fn observe_strategy_load(&self, domain: &str, strategy: &str, duration_secs: f64) {
        self.inner
            .strategy_load_seconds
            .with_label_values(&[domain, strategy])
            .observe(duration_secs);
    }

    pub fn set_strategies_loaded(&self, domain: &str, count: i64) {
        self.inner
            .strategies_loaded
            .with_label_values(&[domain])
            .set(count);
    }

    /// Served predictions so far for a (domain, strategy) pair
    pub fn predictions_served(&self, domain: &str, strategy: &str) -> u64 {
        self.inner
            .predictions
            .with_label_values(&[domain, strategy])
            .get()
    }
}

/// Structured logger for service events
///
/// Emits records tagged with an `event` field so log pipelines can select
/// them without parsing messages.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a served prediction
    pub fn log_prediction(&self, domain: &str, strategy: &str, value: f64, elapsed_us: u64) {
        info!(
            event = "prediction_served",
            instance = %self.instance,
            domain = %domain,
            strategy = %strategy,
            value = value,
            elapsed_us = elapsed_us,
            "Prediction served"
        );
    }

    /// Log the outcome of loading a strategy
    pub fn log_strategy_load(
        &self,
        domain: &str,
        strategy: &str,
        elapsed_ms: u64,
        error: Option<&str>,
    ) {
        match error {
            None => info!(
                event = "strategy_loaded",
                instance = %self.instance,
                domain = %domain,
                strategy = %strategy,
                elapsed_ms = elapsed_ms,
                "Strategy artifacts loaded"
            ),
            Some(error) => warn!(
                event = "strategy_load_failed",
                instance = %self.instance,
                domain = %domain,
                strategy = %strategy,
                elapsed_ms = elapsed_ms,
                error = %error,
                "Strategy failed to load, it will keep reporting this error"
            ),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            port = port,
            "Forecast service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Forecast service shutting down"
        );
    }
}

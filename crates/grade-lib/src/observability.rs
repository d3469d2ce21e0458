//! Observability infrastructure for the grade predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction and load counters, loaded model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounter,
    model_loads_total: IntCounterVec,
    model_loaded: IntGauge,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "grade_predictor_prediction_latency_seconds",
                "Time spent evaluating the model for one prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "grade_predictor_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter!(
                "grade_predictor_prediction_errors_total",
                "Total number of failed prediction requests"
            )
            .expect("Failed to register prediction_errors_total"),

            model_loads_total: register_int_counter_vec!(
                "grade_predictor_model_loads_total",
                "Model load attempts by source and outcome",
                &["source", "outcome"]
            )
            .expect("Failed to register model_loads_total"),

            model_loaded: register_int_gauge!(
                "grade_predictor_model_loaded",
                "1 when a model snapshot is serving, 0 otherwise"
            )
            .expect("Failed to register model_loaded"),

            model_info: register_gauge_vec!(
                "grade_predictor_model_info",
                "Information about the currently loaded model",
                &["model_name", "source"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    /// Record a load attempt. `source` is "registry", "local" or "none".
    pub fn record_load(&self, source: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .model_loads_total
            .with_label_values(&[source, outcome])
            .inc();
    }

    /// Publish the serving model, or clear it when `model` is None
    pub fn set_model(&self, model: Option<(&str, &str)>) {
        self.inner().model_info.reset();
        match model {
            Some((name, source)) => {
                self.inner().model_info.with_label_values(&[name, source]).set(1.0);
                self.inner().model_loaded.set(1);
            }
            None => self.inner().model_loaded.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for loads, predictions
/// and lifecycle events.
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

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            addr = %addr,
            "Grade predictor started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Grade predictor shutting down"
        );
    }

    /// Log a successful model load
    pub fn log_model_loaded(
        &self,
        model_name: &str,
        source: &str,
        checksum: &str,
        features: usize,
        targets: usize,
    ) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model_name = %model_name,
            source = %source,
            checksum = %checksum,
            input_courses = features,
            output_courses = targets,
            "Model snapshot published"
        );
    }

    /// Log a failed model load
    pub fn log_model_load_failed(&self, error: &str, kept_previous: bool) {
        if kept_previous {
            warn!(
                event = "model_load_failed",
                instance = %self.instance,
                error = %error,
                kept_previous = true,
                "Model reload failed, keeping previous snapshot"
            );
        } else {
            warn!(
                event = "model_load_failed",
                instance = %self.instance,
                error = %error,
                kept_previous = false,
                "Model load failed, service not ready"
            );
        }
    }

    /// Log a registry fallback to local files
    pub fn log_registry_fallback(&self, reason: &str) {
        warn!(
            event = "registry_fallback",
            instance = %self.instance,
            reason = %reason,
            "Model registry unavailable, using local model file"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(
        &self,
        model_name: &str,
        provided: usize,
        known: usize,
        elapsed_us: u128,
    ) {
        info!(
            event = "prediction_served",
            instance = %self.instance,
            model_name = %model_name,
            provided_courses = provided,
            known_courses = known,
            elapsed_us = elapsed_us as u64,
            "Served grade prediction"
        );
    }
}

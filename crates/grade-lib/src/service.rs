//! Prediction service
//!
//! Owns the currently published [`ModelSnapshot`]. Requests take a cheap
//! `Arc` clone of the snapshot and never observe a partially loaded model.
//! Loads are serialized and only publish a snapshot that validated; a
//! failed reload leaves the previous snapshot serving.

use crate::artifacts::{ArtifactLoader, MetricsLookup, RegistryOutcome, UNKNOWN_MODEL};
use crate::error::PredictError;
use crate::health::{Component, HealthRegistry};
use crate::models::{GradePrediction, Grades, HealthStatus, ModelInfo};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::snapshot::ModelSnapshot;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

pub struct ModelService {
    loader: ArtifactLoader,
    lookup: MetricsLookup,
    current: RwLock<Option<Arc<ModelSnapshot>>>,
    reload_lock: Mutex<()>,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
    health: HealthRegistry,
}

impl ModelService {
    /// Create a service with no model loaded. Call [`ModelService::load`]
    /// before serving predictions.
    pub fn new(loader: ArtifactLoader, lookup: MetricsLookup) -> Self {
        Self {
            loader,
            lookup,
            current: RwLock::new(None),
            reload_lock: Mutex::new(()),
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::new("grade-server"),
            health: HealthRegistry::new(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Load (or reload) all artifacts and publish the new snapshot.
    ///
    /// Returns whether a new snapshot was published. Concurrent calls run
    /// one at a time.
    pub async fn load(&self) -> bool {
        let _guard = self.reload_lock.lock().await;
        let had_previous = self.is_loaded();

        let attempt = self.loader.attempt().await;
        match &attempt.registry {
            None | Some(RegistryOutcome::Disabled) => {}
            Some(RegistryOutcome::Used) => self.health.healthy(Component::Registry),
            Some(RegistryOutcome::FellBack(reason)) => {
                self.logger.log_registry_fallback(reason);
                self.health.degraded(Component::Registry, reason.clone());
            }
        }

        match attempt.result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let source = snapshot.source().label();
                self.metrics.record_load(source, true);
                self.metrics.set_model(Some((snapshot.model_name(), source)));
                self.logger.log_model_loaded(
                    snapshot.model_name(),
                    &snapshot.source().to_string(),
                    snapshot.checksum(),
                    snapshot.features().len(),
                    snapshot.targets().len(),
                );

                self.publish(snapshot);
                self.health.healthy(Component::Model);
                true
            }
            Err(e) => {
                let message = e.to_string();
                self.metrics.record_load("none", false);
                self.logger.log_model_load_failed(&message, had_previous);

                if had_previous {
                    self.health
                        .degraded(Component::Model, format!("reload failed: {message}"));
                } else {
                    self.health.unhealthy(Component::Model, message);
                }
                false
            }
        }
    }

    fn publish(&self, snapshot: Arc<ModelSnapshot>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(snapshot);
    }

    /// The currently published snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<ModelSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Best model name from metadata, or "Unknown" when nothing is loaded
    pub fn model_name(&self) -> String {
        self.snapshot()
            .map(|s| s.model_name().to_string())
            .unwrap_or_else(|| UNKNOWN_MODEL.to_string())
    }

    pub fn model_info(&self) -> Option<ModelInfo> {
        let snapshot = self.snapshot()?;
        let model_name = snapshot.model_name().to_string();
        let metrics = self.lookup.resolve(snapshot.metadata(), &model_name);

        Some(ModelInfo {
            model_name,
            input_courses: snapshot.features().courses().to_vec(),
            output_courses: snapshot.targets().courses().to_vec(),
            metrics,
        })
    }

    pub fn input_courses(&self) -> Option<Vec<String>> {
        self.snapshot().map(|s| s.features().courses().to_vec())
    }

    pub fn output_courses(&self) -> Option<Vec<String>> {
        self.snapshot().map(|s| s.targets().courses().to_vec())
    }

    /// Predict S5-S6 grades from whatever S1-S4 grades are known.
    ///
    /// Courses missing from `grades` are treated as 50.0 and unknown course
    /// codes are ignored.
    pub fn predict(&self, grades: &Grades) -> Result<GradePrediction, PredictError> {
        let Some(snapshot) = self.snapshot() else {
            self.metrics.inc_prediction_errors();
            return Err(PredictError::NotReady);
        };

        let start = Instant::now();
        let result = snapshot.predict(grades);
        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());

        match result {
            Ok(predictions) => {
                self.metrics.inc_predictions();
                let known = grades
                    .keys()
                    .filter(|code| snapshot.features().contains(code))
                    .count();
                self.logger.log_prediction(
                    snapshot.model_name(),
                    grades.len(),
                    known,
                    elapsed.as_micros(),
                );
                Ok(GradePrediction {
                    predictions,
                    model_used: snapshot.model_name().to_string(),
                })
            }
            Err(e) => {
                self.metrics.inc_prediction_errors();
                Err(e)
            }
        }
    }

    /// Liveness payload; the process is healthy even without a model
    pub fn health_status(&self) -> HealthStatus {
        let snapshot = self.snapshot();
        HealthStatus {
            status: "healthy".to_string(),
            model_loaded: snapshot.is_some(),
            model_name: snapshot.map(|s| s.model_name().to_string()),
        }
    }
}

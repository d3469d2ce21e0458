//! Model artifact loading
//!
//! This module provides:
//! - Ordered feature/target course schemas
//! - Metadata parsing with an explicit metrics lookup order
//! - An MLflow registry client for fetching the model itself
//! - The loader that assembles a validated [`ModelSnapshot`]

mod metadata;
mod registry;
mod schema;

pub use metadata::{
    Metadata, MetricsLookup, MetricsRecord, ModelKey, DEFAULT_FALLBACK_KEY, UNKNOWN_MODEL,
};
pub use registry::{
    MlflowRegistry, ModelRegistry, RegistryConfig, RegistryModel, PRODUCTION_STAGE,
};
pub use schema::CourseSchema;

use crate::error::LoadError;
use crate::predictor::{load_regressor, ModelFormat};
use crate::snapshot::{ModelSnapshot, ModelSource};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Local artifact file locations
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub feature_columns: PathBuf,
    pub target_columns: PathBuf,
    pub metadata: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/best_model.onnx"),
            feature_columns: PathBuf::from("models/feature_columns.json"),
            target_columns: PathBuf::from("models/target_columns.json"),
            metadata: PathBuf::from("models/model_metadata.json"),
        }
    }
}

/// What happened to the registry during one load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOutcome {
    /// No registry configured
    Disabled,
    /// Model came from the registry
    Used,
    /// Registry failed; the local model file was used instead
    FellBack(String),
}

/// A freshly built snapshot and how it was sourced
#[derive(Debug)]
pub struct LoadReport {
    pub snapshot: ModelSnapshot,
    pub registry: RegistryOutcome,
}

/// Result of one load, successful or not
#[derive(Debug)]
pub struct LoadAttempt {
    /// None when the load failed before the registry was consulted
    pub registry: Option<RegistryOutcome>,
    pub result: Result<ModelSnapshot, LoadError>,
}

/// Builds model snapshots from the registry and local files
pub struct ArtifactLoader {
    paths: ArtifactPaths,
    registry: Option<Arc<dyn ModelRegistry>>,
}

impl ArtifactLoader {
    /// Loader that only reads local files
    pub fn local(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            registry: None,
        }
    }

    /// Loader that prefers `registry` for the model bytes
    pub fn with_registry(paths: ArtifactPaths, registry: Arc<dyn ModelRegistry>) -> Self {
        Self {
            paths,
            registry: Some(registry),
        }
    }

    /// Loader for a registry configuration; an unconfigured or invalid
    /// registry degrades to local-only loading.
    pub fn from_config(paths: ArtifactPaths, registry: &RegistryConfig) -> Self {
        if !registry.is_configured() {
            return Self::local(paths);
        }
        match MlflowRegistry::new(registry.clone()) {
            Ok(client) => Self::with_registry(paths, Arc::new(client)),
            Err(e) => {
                warn!(error = %e, "Invalid registry configuration, using local model only");
                Self::local(paths)
            }
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn has_registry(&self) -> bool {
        self.registry.is_some()
    }

    /// Build a validated snapshot. Schemas and metadata always come from
    /// local files; the model comes from the registry when it is available
    /// and compatible, otherwise from the local model file.
    pub async fn load(&self) -> Result<LoadReport, LoadError> {
        let attempt = self.attempt().await;
        let snapshot = attempt.result?;
        Ok(LoadReport {
            snapshot,
            registry: attempt.registry.unwrap_or(RegistryOutcome::Disabled),
        })
    }

    /// Like [`ArtifactLoader::load`], but keeps the registry outcome when
    /// the load as a whole fails
    pub async fn attempt(&self) -> LoadAttempt {
        let (features, targets, metadata) = match self.read_local_artifacts() {
            Ok(artifacts) => artifacts,
            Err(e) => {
                return LoadAttempt {
                    registry: None,
                    result: Err(e),
                }
            }
        };

        let registry = match &self.registry {
            None => RegistryOutcome::Disabled,
            Some(registry) => {
                match self
                    .load_from_registry(registry.as_ref(), &features, &targets, &metadata)
                    .await
                {
                    Ok(snapshot) => {
                        return LoadAttempt {
                            registry: Some(RegistryOutcome::Used),
                            result: Ok(snapshot),
                        }
                    }
                    Err(e) => {
                        warn!(
                            registry = %registry.describe(),
                            error = %e,
                            "Registry load failed, falling back to local model file"
                        );
                        RegistryOutcome::FellBack(e.to_string())
                    }
                }
            }
        };

        LoadAttempt {
            registry: Some(registry),
            result: self.load_local(features, targets, metadata),
        }
    }

    fn read_local_artifacts(&self) -> Result<(CourseSchema, CourseSchema, Metadata), LoadError> {
        let features = CourseSchema::from_file("feature", &self.paths.feature_columns)?;
        let targets = CourseSchema::from_file("target", &self.paths.target_columns)?;
        let metadata = Metadata::from_file(&self.paths.metadata)?;

        debug!(
            features = features.len(),
            targets = targets.len(),
            best_model = %metadata.model_name(),
            "Loaded schemas and metadata"
        );

        Ok((features, targets, metadata))
    }

    async fn load_from_registry(
        &self,
        registry: &dyn ModelRegistry,
        features: &CourseSchema,
        targets: &CourseSchema,
        metadata: &Metadata,
    ) -> Result<ModelSnapshot, LoadError> {
        let model = registry.fetch_model().await?;
        let format = ModelFormat::from_path(&model.artifact_path)?;
        let regressor = load_regressor(&model.bytes, format, features.len())?;

        ModelSnapshot::new(
            regressor,
            features.clone(),
            targets.clone(),
            metadata.clone(),
            ModelSource::Registry {
                name: model.name,
                version: model.version,
            },
            &model.bytes,
        )
    }

    fn load_local(
        &self,
        features: CourseSchema,
        targets: CourseSchema,
        metadata: Metadata,
    ) -> Result<ModelSnapshot, LoadError> {
        let path = &self.paths.model;
        let format = ModelFormat::from_path(&path.to_string_lossy())?;
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let regressor = load_regressor(&bytes, format, features.len())?;

        let snapshot = ModelSnapshot::new(
            regressor,
            features,
            targets,
            metadata,
            ModelSource::Local { path: path.clone() },
            &bytes,
        )?;

        info!(path = %path.display(), kind = snapshot.kind(), "Loaded local model file");
        Ok(snapshot)
    }
}

//! Immutable loaded-model snapshot
//!
//! A snapshot bundles the regressor with its feature schema, target schema
//! and metadata. It is validated once on construction and never mutated;
//! reloading builds a new snapshot and swaps it in.

use crate::artifacts::{CourseSchema, Metadata};
use crate::error::{LoadError, PredictError};
use crate::models::Grades;
use crate::predictor::{build_feature_row, format_predictions, Regressor, DEFAULT_GRADE};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// Where the model bytes came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Registry { name: String, version: String },
    Local { path: PathBuf },
}

impl ModelSource {
    /// Short label used in metrics
    pub fn label(&self) -> &'static str {
        match self {
            ModelSource::Registry { .. } => "registry",
            ModelSource::Local { .. } => "local",
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Registry { name, version } => write!(f, "registry:{}/{}", name, version),
            ModelSource::Local { path } => write!(f, "file:{}", path.display()),
        }
    }
}

/// A fully validated model bundle
pub struct ModelSnapshot {
    regressor: Box<dyn Regressor>,
    features: CourseSchema,
    targets: CourseSchema,
    metadata: Metadata,
    source: ModelSource,
    checksum: String,
    loaded_at: DateTime<Utc>,
}

impl fmt::Debug for ModelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSnapshot")
            .field("kind", &self.regressor.kind())
            .field("features", &self.features.len())
            .field("targets", &self.targets.len())
            .field("model_name", &self.model_name())
            .field("source", &self.source)
            .field("checksum", &self.checksum)
            .finish()
    }
}

impl ModelSnapshot {
    /// Assemble and validate a snapshot.
    ///
    /// The regressor is evaluated once on an all-default feature row so that
    /// a model whose input or output width disagrees with the schemas is
    /// rejected here rather than on the first request.
    pub fn new(
        regressor: Box<dyn Regressor>,
        features: CourseSchema,
        targets: CourseSchema,
        metadata: Metadata,
        source: ModelSource,
        model_bytes: &[u8],
    ) -> Result<Self, LoadError> {
        if let Some(width) = regressor.input_width() {
            if width != features.len() {
                return Err(LoadError::InputMismatch {
                    expected: features.len(),
                    actual: width,
                });
            }
        }

        let default_row = vec![DEFAULT_GRADE; features.len()];
        let outputs = regressor.predict_row(&default_row).map_err(LoadError::Model)?;
        if outputs.len() != targets.len() {
            return Err(LoadError::OutputMismatch {
                expected: targets.len(),
                actual: outputs.len(),
            });
        }

        Ok(Self {
            regressor,
            features,
            targets,
            metadata,
            source,
            checksum: compute_checksum(model_bytes),
            loaded_at: Utc::now(),
        })
    }

    /// Predict target grades. Deterministic for a given snapshot.
    pub fn predict(&self, grades: &Grades) -> Result<Grades, PredictError> {
        let row = build_feature_row(&self.features, grades);
        let raw = self
            .regressor
            .predict_row(&row)
            .map_err(|e| PredictError::Failed(format!("{e:#}")))?;
        format_predictions(&self.targets, &raw)
    }

    pub fn model_name(&self) -> &str {
        self.metadata.model_name()
    }

    pub fn features(&self) -> &CourseSchema {
        &self.features
    }

    pub fn targets(&self) -> &CourseSchema {
        &self.targets
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    pub fn kind(&self) -> &'static str {
        self.regressor.kind()
    }

    /// SHA-256 of the serialized model
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

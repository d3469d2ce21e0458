//! Error types for artifact loading and prediction

use std::path::PathBuf;
use thiserror::Error;

/// Failure to build a model snapshot. Always recoverable: the service keeps
/// running and reports itself as not loaded (or keeps the previous snapshot).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model artifact: {0:#}")]
    Model(anyhow::Error),

    #[error("{schema} schema is empty")]
    EmptySchema { schema: &'static str },

    #[error("{schema} schema lists course {course} more than once")]
    DuplicateCourse { schema: &'static str, course: String },

    #[error("model produced {actual} outputs, target schema has {expected} courses")]
    OutputMismatch { expected: usize, actual: usize },

    #[error("model expects {actual} inputs, feature schema has {expected} courses")]
    InputMismatch { expected: usize, actual: usize },

    #[error("unsupported model format for {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failure talking to the remote model registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry uri {uri}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("registry returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("no versions registered for model {0}")]
    NoVersions(String),

    #[error("model version {version} of {name} has no run id")]
    MissingRun { name: String, version: String },
}

/// Failure serving a prediction
#[derive(Debug, Error)]
pub enum PredictError {
    /// No snapshot has been loaded yet. Retryable.
    #[error("model not loaded")]
    NotReady,

    /// The model itself failed to evaluate
    #[error("prediction failed: {0}")]
    Failed(String),
}

impl PredictError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PredictError::NotReady)
    }
}

//! Grade prediction library
//!
//! This crate provides the core functionality for:
//! - Loading model artifacts from local files or an MLflow registry
//! - Validated, immutable model snapshots with hot reload
//! - Feature construction and bounded grade prediction
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod snapshot;

pub use artifacts::{ArtifactLoader, ArtifactPaths, MetricsLookup, RegistryConfig};
pub use error::{LoadError, PredictError, RegistryError};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use service::ModelService;
pub use snapshot::{ModelSnapshot, ModelSource};

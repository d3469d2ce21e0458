//! Server configuration

use anyhow::{Context, Result};
use grade_lib::{ArtifactPaths, MetricsLookup, RegistryConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Optional config file base name (`grade-server.toml`, `.json`, `.yaml`)
const CONFIG_FILE: &str = "grade-server";

/// Server configuration. Every field can be set through the environment
/// variable of the same name in upper case.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    pub model_path: PathBuf,
    pub feature_columns_path: PathBuf,
    pub target_columns_path: PathBuf,
    pub metadata_path: PathBuf,

    /// Empty disables the registry
    pub mlflow_tracking_uri: String,
    pub mlflow_model_name: String,
    pub mlflow_tracking_username: Option<String>,
    pub mlflow_tracking_password: Option<String>,
    pub mlflow_tracking_token: Option<String>,
    pub mlflow_artifact_path: String,
    pub mlflow_timeout_secs: u64,

    /// Comma separated metadata keys tried after the model's own name
    pub metrics_fallback_keys: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let paths = ArtifactPaths::default();
        let registry = RegistryConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: paths.model,
            feature_columns_path: paths.feature_columns,
            target_columns_path: paths.target_columns,
            metadata_path: paths.metadata,
            mlflow_tracking_uri: registry.tracking_uri,
            mlflow_model_name: registry.model_name,
            mlflow_tracking_username: None,
            mlflow_tracking_password: None,
            mlflow_tracking_token: None,
            mlflow_artifact_path: registry.artifact_path,
            mlflow_timeout_secs: registry.timeout.as_secs(),
            metrics_fallback_keys: grade_lib::artifacts::DEFAULT_FALLBACK_KEY.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the optional config file and the process
    /// environment. Environment variables win.
    pub fn load() -> Result<Self> {
        Self::build(None)
    }

    /// Load configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self> {
        Self::build(Some(vars))
    }

    fn build(vars: Option<config::Map<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::default().source(vars))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid server configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model_path.clone(),
            feature_columns: self.feature_columns_path.clone(),
            target_columns: self.target_columns_path.clone(),
            metadata: self.metadata_path.clone(),
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            tracking_uri: self.mlflow_tracking_uri.trim().to_string(),
            model_name: self.mlflow_model_name.clone(),
            artifact_path: self.mlflow_artifact_path.clone(),
            username: non_empty(&self.mlflow_tracking_username),
            password: non_empty(&self.mlflow_tracking_password),
            token: non_empty(&self.mlflow_tracking_token),
            timeout: Duration::from_secs(self.mlflow_timeout_secs),
        }
    }

    pub fn metrics_lookup(&self) -> MetricsLookup {
        MetricsLookup::with_fallbacks(self.metrics_fallback_keys.split(','))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.trim().is_empty()).map(str::to_string)
}

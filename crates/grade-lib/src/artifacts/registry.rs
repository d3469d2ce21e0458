//! MLflow model registry client
//!
//! Resolves the registered model version in the "Production" stage (or the
//! latest version when nothing is promoted) and downloads its serialized
//! model through the tracking server's artifact endpoint.

use crate::error::RegistryError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Stage preferred when resolving a model version
pub const PRODUCTION_STAGE: &str = "Production";

/// Configuration for the registry client
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Tracking server URI; empty disables the registry
    pub tracking_uri: String,
    /// Registered model name
    pub model_name: String,
    /// Path of the serialized model inside the run's artifacts
    pub artifact_path: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tracking_uri: String::new(),
            model_name: "grade-predictor".to_string(),
            artifact_path: "model/model.onnx".to_string(),
            username: None,
            password: None,
            token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl RegistryConfig {
    /// True when both an endpoint and a model name are set
    pub fn is_configured(&self) -> bool {
        !self.tracking_uri.trim().is_empty() && !self.model_name.trim().is_empty()
    }
}

/// Model bytes fetched from a registry
#[derive(Debug, Clone)]
pub struct RegistryModel {
    pub name: String,
    pub version: String,
    pub stage: Option<String>,
    pub artifact_path: String,
    pub bytes: Vec<u8>,
}

/// A source of registered model artifacts
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn fetch_model(&self) -> Result<RegistryModel, RegistryError>;

    /// Endpoint description for logs
    fn describe(&self) -> String;
}

#[derive(Debug, Serialize)]
struct LatestVersionsRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stages: Vec<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct LatestVersionsResponse {
    #[serde(default)]
    model_versions: Vec<ModelVersionRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelVersionRecord {
    version: String,
    #[serde(default)]
    current_stage: Option<String>,
    #[serde(default)]
    run_id: Option<String>,
}

impl ModelVersionRecord {
    fn version_number(&self) -> u64 {
        self.version.parse().unwrap_or(0)
    }
}

/// Registry client speaking the MLflow REST API
pub struct MlflowRegistry {
    client: Client,
    base_url: Url,
    config: RegistryConfig,
}

impl MlflowRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        // A trailing slash keeps any path prefix when joining endpoints
        let mut uri = config.tracking_uri.trim().to_string();
        if !uri.ends_with('/') {
            uri.push('/');
        }
        let base_url = Url::parse(&uri).map_err(|source| RegistryError::InvalidUri {
            uri: config.tracking_uri.clone(),
            source,
        })?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, base_url, config })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RegistryError> {
        self.base_url
            .join(path)
            .map_err(|source| RegistryError::InvalidUri {
                uri: format!("{}{}", self.base_url, path),
                source,
            })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.config.token {
            request.bearer_auth(token)
        } else if let Some(username) = &self.config.username {
            request.basic_auth(username, self.config.password.as_deref())
        } else {
            request
        }
    }

    async fn latest_versions(
        &self,
        stages: &[&str],
    ) -> Result<Vec<ModelVersionRecord>, RegistryError> {
        let url = self.endpoint("api/2.0/mlflow/registered-models/get-latest-versions")?;
        let body = LatestVersionsRequest {
            name: &self.config.model_name,
            stages: stages.to_vec(),
        };

        let response = self
            .authorize(self.client.post(url).json(&body))
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: LatestVersionsResponse = response.json().await?;
        Ok(parsed.model_versions)
    }

    /// Production version if one exists, otherwise the highest version
    async fn resolve_version(&self) -> Result<ModelVersionRecord, RegistryError> {
        let production = self.latest_versions(&[PRODUCTION_STAGE]).await?;
        if let Some(version) = production
            .into_iter()
            .max_by_key(ModelVersionRecord::version_number)
        {
            return Ok(version);
        }

        debug!(model = %self.config.model_name, "No production version, using latest");
        self.latest_versions(&[])
            .await?
            .into_iter()
            .max_by_key(ModelVersionRecord::version_number)
            .ok_or_else(|| RegistryError::NoVersions(self.config.model_name.clone()))
    }

    async fn download_artifact(&self, run_id: &str) -> Result<Vec<u8>, RegistryError> {
        let mut url = self.endpoint("get-artifact")?;
        url.query_pairs_mut()
            .append_pair("path", &self.config.artifact_path)
            .append_pair("run_uuid", run_id);

        let response = self.authorize(self.client.get(url)).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ModelRegistry for MlflowRegistry {
    async fn fetch_model(&self) -> Result<RegistryModel, RegistryError> {
        let version = self.resolve_version().await?;
        let run_id = version
            .run_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RegistryError::MissingRun {
                name: self.config.model_name.clone(),
                version: version.version.clone(),
            })?;

        let bytes = self.download_artifact(&run_id).await?;

        info!(
            model = %self.config.model_name,
            version = %version.version,
            stage = ?version.current_stage,
            size = bytes.len(),
            "Fetched model from registry"
        );

        Ok(RegistryModel {
            name: self.config.model_name.clone(),
            version: version.version,
            stage: version.current_stage,
            artifact_path: self.config.artifact_path.clone(),
            bytes,
        })
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.base_url, self.config.model_name)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RegistryError::Status { status, body })
}

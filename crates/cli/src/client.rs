//! API client for communicating with the grade prediction server

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Error reported by the server in a `{"detail": "..."}` body
#[derive(Debug, thiserror::Error)]
#[error("API error ({status}): {detail}")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

/// API client for the grade prediction server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid API URL")?;
        // Keep any path prefix when joining relative paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            return Err(ApiError { status, detail }.into());
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("health").await
    }

    pub async fn model_info(&self) -> Result<ModelInfo> {
        self.get("model/info").await
    }

    pub async fn courses(&self, set: &str) -> Result<CourseList> {
        self.get(&format!("courses/{set}")).await
    }

    pub async fn predict(&self, grades: BTreeMap<String, f64>) -> Result<Prediction> {
        self.post("predict", &PredictRequest { grades }).await
    }

    pub async fn reload(&self) -> Result<ReloadResponse> {
        self.post("model/reload", &serde_json::json!({})).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub rmse: f64,
    #[serde(default)]
    pub r2: f64,
    #[serde(default)]
    pub cv_r2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub input_courses: Vec<String>,
    pub output_courses: Vec<String>,
    #[serde(default)]
    pub metrics: ModelMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseList {
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub grades: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub predictions: BTreeMap<String, f64>,
    pub model_used: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_health() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_header("content-type", "application/json")
            .with_body(
                json!({"status": "healthy", "model_loaded": true, "model_name": "XGBoost"})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        mock.assert_async().await;
        assert!(health.model_loaded);
        assert_eq!(health.model_name.as_deref(), Some("XGBoost"));
    }

    #[tokio::test]
    async fn test_predict_sends_grades() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(Matcher::Json(json!({"grades": {"M1100": 75.0}})))
            .with_header("content-type", "application/json")
            .with_body(
                json!({"predictions": {"M3301": 68.4}, "model_used": "XGBoost"}).to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let grades = BTreeMap::from([("M1100".to_string(), 75.0)]);
        let prediction = client.predict(grades).await.unwrap();

        mock.assert_async().await;
        assert_eq!(prediction.predictions["M3301"], 68.4);
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/model/info")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(json!({"detail": "Model not loaded"}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.model_info().await.unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().unwrap();

        assert_eq!(api_err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api_err.detail, "Model not loaded");
    }

    #[tokio::test]
    async fn test_base_url_path_prefix_is_kept() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/grades/courses/input")
            .with_header("content-type", "application/json")
            .with_body(json!({"courses": ["M1100", "I1100"]}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/grades", server.url())).unwrap();
        let courses = client.courses("input").await.unwrap();

        mock.assert_async().await;
        assert_eq!(courses.courses, vec!["M1100", "I1100"]);
    }

    #[test]
    fn test_invalid_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}

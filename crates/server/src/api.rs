//! HTTP API for predictions, model introspection, health checks and
//! Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use grade_lib::{
    health::ComponentStatus, CourseList, GradeInput, GradePrediction, HealthStatus, ModelInfo,
    ModelService, PredictError,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ModelService>,
}

impl AppState {
    pub fn new(service: Arc<ModelService>) -> Self {
        Self { service }
    }
}

/// Error returned by handlers, rendered as `{"detail": "..."}`
#[derive(Debug)]
pub enum ApiError {
    NotLoaded,
    PredictionFailed(String),
    ReloadFailed(String),
    Internal(String),
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::NotReady => ApiError::NotLoaded,
            PredictError::Failed(msg) => ApiError::PredictionFailed(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotLoaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Model not loaded".to_string(),
            ),
            ApiError::PredictionFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Prediction failed: {msg}"),
            ),
            ApiError::ReloadFailed(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Liveness and model status. Always 200.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(state.service.health_status())
}

/// Component health - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.service.health().health();

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if a model is serving, 503 if not
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.service.health().readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {e}")))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<ModelInfo>, ApiError> {
    state.service.model_info().map(Json).ok_or(ApiError::NotLoaded)
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(input): Json<GradeInput>,
) -> Result<Json<GradePrediction>, ApiError> {
    state
        .service
        .predict(&input.grades)
        .map(Json)
        .map_err(|e| {
            if e.is_retryable() {
                info!(error = %e, "Prediction requested before model load");
            } else {
                error!(error = %e, "Prediction failed");
            }
            ApiError::from(e)
        })
}

async fn input_courses(State(state): State<Arc<AppState>>) -> Result<Json<CourseList>, ApiError> {
    state
        .service
        .input_courses()
        .map(|courses| Json(CourseList { courses }))
        .ok_or(ApiError::NotLoaded)
}

async fn output_courses(State(state): State<Arc<AppState>>) -> Result<Json<CourseList>, ApiError> {
    state
        .service
        .output_courses()
        .map(|courses| Json(CourseList { courses }))
        .ok_or(ApiError::NotLoaded)
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    reloaded: bool,
    model_name: String,
}

/// Hot reload. On failure the previous snapshot keeps serving.
async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>, ApiError> {
    info!("Model reload requested over HTTP");

    if state.service.load().await {
        Ok(Json(ReloadResponse {
            reloaded: true,
            model_name: state.service.model_name(),
        }))
    } else {
        let detail = if state.service.is_loaded() {
            format!(
                "Model reload failed, still serving {}",
                state.service.model_name()
            )
        } else {
            "Model reload failed, no model loaded".to_string()
        };
        Err(ApiError::ReloadFailed(detail))
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/model/info", get(model_info))
        .route("/model/reload", post(reload))
        .route("/predict", post(predict))
        .route("/courses/input", get(input_courses))
        .route("/courses/output", get(output_courses))
        .layer(cors)
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use grade_lib::{ArtifactLoader, ArtifactPaths, MetricsLookup, ModelService};
use grade_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const N_FEATURES: usize = 30;
const N_TARGETS: usize = 17;

fn codes(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

/// Each target is the mean of the inputs plus `offset`
fn linear_model(n_features: usize, n_targets: usize, offset: f64) -> String {
    let w = 1.0 / n_features as f64;
    let coefficients = vec![vec![w; n_features]; n_targets];
    let intercepts = vec![offset; n_targets];
    json!({"coefficients": coefficients, "intercepts": intercepts}).to_string()
}

fn write_artifacts(dir: &Path) -> ArtifactPaths {
    let paths = ArtifactPaths {
        model: dir.join("best_model.json"),
        feature_columns: dir.join("feature_columns.json"),
        target_columns: dir.join("target_columns.json"),
        metadata: dir.join("model_metadata.json"),
    };
    std::fs::write(&paths.model, linear_model(N_FEATURES, N_TARGETS, 2.0)).unwrap();
    std::fs::write(
        &paths.feature_columns,
        json!(codes("S", N_FEATURES)).to_string(),
    )
    .unwrap();
    std::fs::write(
        &paths.target_columns,
        json!(codes("T", N_TARGETS)).to_string(),
    )
    .unwrap();
    std::fs::write(
        &paths.metadata,
        json!({
            "best_model": "Random Forest",
            "xgboost": {"rmse": 6.1, "r2": 0.71, "cv_r2": 0.69},
            "random_forest": {"rmse": 5.4, "r2": 0.75, "cv_r2": 0.72}
        })
        .to_string(),
    )
    .unwrap();
    paths
}

async fn setup_test_app(load: bool) -> (Router, Arc<AppState>, TempDir, ArtifactPaths) {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(dir.path());

    let service = Arc::new(ModelService::new(
        ArtifactLoader::local(paths.clone()),
        MetricsLookup::default(),
    ));
    if load {
        assert!(service.load().await);
    }

    let state = Arc::new(AppState::new(service));
    let router = create_router(state.clone());
    (router, state, dir, paths)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_when_loaded() {
    let (app, _state, _dir, _paths) = setup_test_app(true).await;

    for uri in ["/", "/health"] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["model_name"], "Random Forest");
    }
}

#[tokio::test]
async fn test_health_is_ok_without_model() {
    let (app, _state, _dir, _paths) = setup_test_app(false).await;

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], false);
    assert!(body["model_name"].is_null());
}

#[tokio::test]
async fn test_readyz_tracks_model_state() {
    let (app, state, _dir, _paths) = setup_test_app(false).await;

    let (status, body) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    assert!(state.service.load().await);
    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_predict_returns_all_targets() {
    let (app, _state, _dir, _paths) = setup_test_app(true).await;

    let grades: serde_json::Map<String, Value> =
        codes("S", 10).into_iter().map(|c| (c, json!(70.0))).collect();
    let (status, body) = post_json(app, "/predict", json!({ "grades": grades })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_used"], "Random Forest");
    let predictions = body["predictions"].as_object().unwrap();
    assert_eq!(predictions.len(), N_TARGETS);
    for code in codes("T", N_TARGETS) {
        let value = predictions[&code].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&value));
        assert_eq!(value, 58.67);
    }
}

#[tokio::test]
async fn test_predict_ignores_unknown_courses() {
    let (app, _state, _dir, _paths) = setup_test_app(true).await;

    let (_, empty) = post_json(app.clone(), "/predict", json!({ "grades": {} })).await;
    let (status, unknown) =
        post_json(app, "/predict", json!({ "grades": {"ZZ999": 12.0} })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty["predictions"], unknown["predictions"]);
    assert_eq!(empty["predictions"]["T0"], 52.0);
}

#[tokio::test]
async fn test_predict_returns_503_when_not_loaded() {
    let (app, _state, _dir, _paths) = setup_test_app(false).await;

    let (status, body) = post_json(app, "/predict", json!({ "grades": {"S0": 80.0} })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Model not loaded");
}

#[tokio::test]
async fn test_predict_rejects_malformed_body() {
    let (app, _state, _dir, _paths) = setup_test_app(true).await;

    let (status, _) = post_json(app, "/predict", json!({ "grades": {"S0": "high"} })).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_model_info() {
    let (app, _state, _dir, _paths) = setup_test_app(true).await;

    let (status, body) = get(app, "/model/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_name"], "Random Forest");
    assert_eq!(body["input_courses"].as_array().unwrap().len(), N_FEATURES);
    assert_eq!(body["output_courses"].as_array().unwrap().len(), N_TARGETS);
    // "Random Forest" normalizes to the random_forest entry
    assert_eq!(body["metrics"]["rmse"], 5.4);
    assert_eq!(body["metrics"]["cv_r2"], 0.72);
}

#[tokio::test]
async fn test_introspection_returns_503_when_not_loaded() {
    let (app, _state, _dir, _paths) = setup_test_app(false).await;

    for uri in ["/model/info", "/courses/input", "/courses/output"] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert_eq!(body["detail"], "Model not loaded");
    }
}

#[tokio::test]
async fn test_course_listings() {
    let (app, _state, _dir, _paths) = setup_test_app(true).await;

    let (status, body) = get(app.clone(), "/courses/input").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["courses"], json!(codes("S", N_FEATURES)));

    let (status, body) = get(app, "/courses/output").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["courses"], json!(codes("T", N_TARGETS)));
}

#[tokio::test]
async fn test_reload_swaps_model() {
    let (app, _state, _dir, paths) = setup_test_app(true).await;

    std::fs::write(&paths.model, linear_model(N_FEATURES, N_TARGETS, 10.0)).unwrap();
    let (status, body) = post_json(app.clone(), "/model/reload", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reloaded"], true);

    let (_, body) = post_json(app, "/predict", json!({ "grades": {} })).await;
    assert_eq!(body["predictions"]["T0"], 60.0);
}

#[tokio::test]
async fn test_failed_reload_keeps_serving() {
    let (app, _state, _dir, paths) = setup_test_app(true).await;

    // Wrong number of outputs for the target schema
    std::fs::write(&paths.model, linear_model(N_FEATURES, 3, 0.0)).unwrap();
    let (status, body) = post_json(app.clone(), "/model/reload", json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("still serving"));

    let (status, body) = post_json(app.clone(), "/predict", json!({ "grades": {} })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"].as_object().unwrap().len(), N_TARGETS);

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state, _dir, _paths) = setup_test_app(true).await;

    let (status, _) = post_json(app.clone(), "/predict", json!({ "grades": {} })).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("grade_predictor_predictions_total"));
    assert!(text.contains("grade_predictor_model_loaded"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let (app, _state, _dir, _paths) = setup_test_app(true).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("origin", "http://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

mod common;

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use gdp_forecast::{server, Pipeline, PipelineArtifacts};

fn artifacts() -> Arc<PipelineArtifacts> {
    static ARTIFACTS: OnceLock<Arc<PipelineArtifacts>> = OnceLock::new();
    ARTIFACTS
        .get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            let config = common::config_in(dir.path(), false);
            Arc::new(Pipeline::run(&config).unwrap())
        })
        .clone()
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let response = server::router(artifacts())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_and_root() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("GDP"));
}

#[tokio::test]
async fn forecasts_are_served_per_scenario() {
    let (status, body) = get("/api/forecasts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (status, body) = get("/api/forecasts/reform").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scenario"], "reform");
    assert_eq!(body["rows"][0]["Year"], 2027);
    assert!(body["rows"][0]["Final GDP Forecast (%)"].is_number());

    let (status, body) = get("/api/forecasts/boom").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn reports_are_exposed() {
    let (status, body) = get("/api/recommendations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["year"], 2025);
    assert!(body["text"].as_str().unwrap().contains("Strategic Recommendations:"));

    let (status, body) = get("/api/evaluation").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["model"]["sarimax"]["rmse"].is_number());

    let (status, body) = get("/api/backtest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"].as_array().unwrap().len(), 5);

    let (status, _) = get("/api/attribution").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn absent_sector_analyses_return_not_found() {
    let (status, _) = get("/api/sectoral/agriculture").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get("/api/sectoral/it").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

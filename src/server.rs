/// API только для чтения поверх готовых результатов конвейера

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::models::scenario::Scenario;
use crate::types::PipelineArtifacts;

#[derive(Clone)]
pub struct AppState {
    artifacts: Arc<PipelineArtifacts>,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub fn router(artifacts: Arc<PipelineArtifacts>) -> Router {
    let state = AppState { artifacts };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/forecasts", get(forecasts))
        .route("/api/forecasts/:scenario", get(forecast_by_scenario))
        .route("/api/recommendations", get(recommendations))
        .route("/api/evaluation", get(evaluation))
        .route("/api/backtest", get(backtest))
        .route("/api/attribution", get(attribution))
        .route("/api/sectoral/agriculture", get(agriculture))
        .route("/api/sectoral/it", get(it_sector))
        .layer(cors)
        .with_state(state)
}

fn not_found(message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message.into() })))
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))))
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "India GDP Forecast API (Rust)",
        "version": env!("CARGO_PKG_VERSION"),
        "generated_at": state.artifacts.generated_at,
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn forecasts(State(state): State<AppState>) -> ApiResult {
    to_json(&state.artifacts.forecasts)
}

async fn forecast_by_scenario(
    State(state): State<AppState>,
    Path(scenario): Path<String>,
) -> ApiResult {
    let scenario: Scenario = scenario
        .parse()
        .map_err(|_| not_found(format!("unknown scenario '{}'", scenario)))?;
    tracing::debug!("Forecast request: {}", scenario);
    match state.artifacts.forecast(scenario) {
        Some(forecast) => to_json(forecast),
        None => Err(not_found(format!("no forecast for {}", scenario))),
    }
}

async fn recommendations(State(state): State<AppState>) -> ApiResult {
    let report = &state.artifacts.recommendations;
    Ok(Json(json!({
        "report": report,
        "text": report.to_string(),
    })))
}

async fn evaluation(State(state): State<AppState>) -> ApiResult {
    to_json(&state.artifacts.evaluation)
}

async fn backtest(State(state): State<AppState>) -> ApiResult {
    match &state.artifacts.backtest {
        Some(report) => to_json(report),
        None => Err(not_found("backtest was not run")),
    }
}

async fn attribution(State(state): State<AppState>) -> ApiResult {
    match &state.artifacts.attribution {
        Some(report) => to_json(report),
        None => Err(not_found("feature attribution is not available")),
    }
}

async fn agriculture(State(state): State<AppState>) -> ApiResult {
    match &state.artifacts.agriculture {
        Some(report) => to_json(report),
        None => Err(not_found("agriculture analysis is not available")),
    }
}

async fn it_sector(State(state): State<AppState>) -> ApiResult {
    match &state.artifacts.it_sector {
        Some(report) => to_json(report),
        None => Err(not_found("IT sector analysis is not available")),
    }
}

//! HTTP handlers for the playground API

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use super::state::{AppState, EvaluationRequest};
use crate::eval::{ModelInfo, Scenario};

/// Scenario as listed by the API
#[derive(Debug, Serialize)]
pub struct ScenarioInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl From<&Scenario> for ScenarioInfo {
    fn from(scenario: &Scenario) -> Self {
        ScenarioInfo {
            id: scenario.id.clone(),
            name: scenario.name.clone(),
            kind: scenario.kind.to_string(),
            description: scenario.description.clone(),
        }
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelInfo>> {
    Json(state.models.list().to_vec())
}

pub async fn list_scenarios(State(state): State<Arc<AppState>>) -> Json<Vec<ScenarioInfo>> {
    Json(
        state
            .evaluator
            .scenarios()
            .iter()
            .map(ScenarioInfo::from)
            .collect(),
    )
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::Value::Object(state.monitor.get_metrics().await))
}

pub async fn reset_metrics(State(state): State<Arc<AppState>>) -> StatusCode {
    state.monitor.reset().await;
    StatusCode::NO_CONTENT
}

/// Validate and start an evaluation in the background
pub async fn start_evaluation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EvaluationRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected evaluation request: {}", rejection.body_text());
            return bad_request(rejection.body_text());
        }
    };

    if let Err(e) = state.validate(&request) {
        return bad_request(e.to_string());
    }

    tokio::spawn(async move {
        // Failures are logged inside run_evaluation
        let _ = state.run_evaluation(&request).await;
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "evaluation_started" })),
    )
        .into_response()
}

pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.collector.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "escoffier-eval"
    }))
}

//! Workflow registry routes.
//!
//! - `GET /api/get_workflows_registry`: `{status, data: {name: summary}, message}`
//! - `GET /api/workflows`
//! - `GET /api/workflows/{name}`

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};

use tasklet_core::state::AppState;
use tasklet_core::workflow::WorkflowSummary;
use tasklet_core::EngineError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get_workflows_registry", get(get_registry))
        .route("/workflows", get(list_workflows))
        .route("/workflows/{name}", get(get_workflow))
}

async fn get_registry(State(state): State<AppState>) -> Json<Value> {
    let mut data = Map::new();
    for summary in state.registry.list() {
        let name = summary.name.clone();
        data.insert(name, serde_json::to_value(summary).unwrap_or_default());
    }
    Json(serde_json::json!({
        "status": "success",
        "data": data,
        "message": "Workflows registry retrieved successfully",
    }))
}

async fn list_workflows(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({ "workflows": state.registry.list() }))
}

async fn get_workflow(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<WorkflowSummary>, EngineError> {
    state
        .registry
        .get(&name)
        .map(|descriptor| Json(descriptor.summary()))
        .ok_or_else(|| EngineError::UnknownWorkflow(format!("no workflow named '{}'", name)))
}

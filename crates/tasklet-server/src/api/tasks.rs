//! Task routes: the two engine operations plus session diagnostics.
//!
//! - `POST   /api/start_task`
//! - `POST   /api/continue_task`
//! - `GET    /api/tasks`
//! - `DELETE /api/tasks/{id}`

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post},
    Json, Router,
};

use tasklet_core::state::AppState;
use tasklet_core::{ContinueRequest, EngineError, Envelope, StartRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start_task", post(start_task))
        .route("/continue_task", post(continue_task))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}", delete(cancel_task))
}

/// Malformed bodies still answer with an envelope.
fn rejected(rejection: JsonRejection) -> Envelope {
    Envelope::failure(None, EngineError::Validation(rejection.body_text()))
}

async fn start_task(
    State(state): State<AppState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Envelope {
    match body {
        Ok(Json(req)) => state.controller.start(req).await,
        Err(rejection) => rejected(rejection),
    }
}

async fn continue_task(
    State(state): State<AppState>,
    body: Result<Json<ContinueRequest>, JsonRejection>,
) -> Envelope {
    match body {
        Ok(Json(req)) => state.controller.continue_task(req).await,
        Err(rejection) => rejected(rejection),
    }
}

async fn list_tasks(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tasks = state.controller.list().await;
    Json(serde_json::json!({ "tasks": tasks }))
}

async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let cancelled = state.controller.cancel(&id).await;
    Json(serde_json::json!({ "task_id": id, "cancelled": cancelled }))
}

//! JSON-RPC 2.0 endpoint powered by `tasklet_core::rpc`.
//!
//! Exposes `POST /api/rpc` for all method calls and `GET /api/rpc/methods`
//! for method discovery.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use tasklet_core::rpc::RpcRouter;
use tasklet_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(rpc_handler))
        .route("/methods", get(list_methods))
}

/// POST /api/rpc: single or batch JSON-RPC request.
///
/// The body is taken raw so unparseable JSON still gets a JSON-RPC
/// `PARSE_ERROR` response.
async fn rpc_handler(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let rpc = RpcRouter::new(state);
    let response = rpc.handle_request(&body).await;
    ([(header::CONTENT_TYPE, "application/json")], response)
}

async fn list_methods(State(state): State<AppState>) -> Json<serde_json::Value> {
    let rpc = RpcRouter::new(state);
    Json(serde_json::json!({ "methods": rpc.method_list() }))
}

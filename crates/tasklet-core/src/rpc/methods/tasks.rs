//! RPC methods for task execution.
//!
//! Methods:
//! - `tasks.start`: start a workflow, returns the first envelope
//! - `tasks.continue`: resume a suspended task with a reply
//! - `tasks.cancel`: drop a suspended task
//! - `tasks.list`: list suspended tasks
//!
//! `tasks.start` and `tasks.continue` always succeed at the RPC level: engine
//! failures are reported inside the returned envelope, exactly as over HTTP.

use serde::{Deserialize, Serialize};

use crate::controller::{ContinueRequest, StartRequest};
use crate::envelope::Envelope;
use crate::rpc::error::RpcError;
use crate::session::SessionInfo;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// tasks.start
// ---------------------------------------------------------------------------

pub async fn start(state: &AppState, params: StartRequest) -> Result<Envelope, RpcError> {
    Ok(state.controller.start(params).await)
}

// ---------------------------------------------------------------------------
// tasks.continue
// ---------------------------------------------------------------------------

pub async fn resume(state: &AppState, params: ContinueRequest) -> Result<Envelope, RpcError> {
    Ok(state.controller.continue_task(params).await)
}

// ---------------------------------------------------------------------------
// tasks.cancel
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelParams {
    #[serde(alias = "task_id")]
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResult {
    pub cancelled: bool,
}

pub async fn cancel(state: &AppState, params: CancelParams) -> Result<CancelResult, RpcError> {
    if params.task_id.trim().is_empty() {
        return Err(RpcError::BadRequest("taskId is required".into()));
    }
    let cancelled = state.controller.cancel(params.task_id.trim()).await;
    Ok(CancelResult { cancelled })
}

// ---------------------------------------------------------------------------
// tasks.list
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub tasks: Vec<SessionInfo>,
}

pub async fn list(state: &AppState) -> Result<ListResult, RpcError> {
    Ok(ListResult {
        tasks: state.controller.list().await,
    })
}

//! RPC methods for the workflow registry.
//!
//! Methods:
//! - `workflows.list`: all registered workflows
//! - `workflows.get`: one workflow by name

use serde::{Deserialize, Serialize};

use crate::rpc::error::RpcError;
use crate::state::AppState;
use crate::workflow::WorkflowSummary;

// ---------------------------------------------------------------------------
// workflows.list
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub workflows: Vec<WorkflowSummary>,
}

pub async fn list(state: &AppState) -> Result<ListResult, RpcError> {
    Ok(ListResult {
        workflows: state.registry.list(),
    })
}

// ---------------------------------------------------------------------------
// workflows.get
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GetParams {
    pub name: String,
}

pub async fn get(state: &AppState, params: GetParams) -> Result<WorkflowSummary, RpcError> {
    state
        .registry
        .get(&params.name)
        .map(|descriptor| descriptor.summary())
        .ok_or_else(|| RpcError::NotFound(format!("Workflow {} not found", params.name)))
}

//! Transport-agnostic JSON-RPC 2.0 dispatcher.
//!
//! `RpcRouter` takes an `AppState` and dispatches incoming JSON-RPC requests
//! to the matching method handler. It can be driven from an axum handler
//! (HTTP) or straight from the CLI.

use serde::Serialize;
use serde_json::Value;

use crate::state::AppState;

use super::error::RpcError;
use super::methods;
use super::types::*;

const SERIALIZE_FAILURE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Failed to serialize response"},"id":null}"#;

/// Transport-agnostic JSON-RPC router.
///
/// ```ignore
/// let router = RpcRouter::new(app_state);
///
/// // From raw JSON string:
/// let response_json = router.handle_request(raw_json_str).await;
///
/// // From a parsed request:
/// let response = router.dispatch(request).await;
/// ```
#[derive(Clone)]
pub struct RpcRouter {
    state: AppState,
}

impl RpcRouter {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Handle a raw JSON string (single request or batch) and return the
    /// serialized response.
    pub async fn handle_request(&self, raw: &str) -> String {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                return serde_json::to_string(&JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
                .unwrap_or_else(|_| SERIALIZE_FAILURE.into());
            }
        };

        let response = self.handle_value(value).await;
        serde_json::to_string(&response).unwrap_or_else(|_| SERIALIZE_FAILURE.into())
    }

    /// Handle a pre-parsed `serde_json::Value`. Arrays are treated as batch
    /// requests and answered with an array.
    pub async fn handle_value(&self, value: Value) -> Value {
        if let Value::Array(batch) = value {
            if batch.is_empty() {
                return to_value_or_default(JsonRpcResponse::error(
                    None,
                    INVALID_REQUEST,
                    "Empty batch",
                ));
            }
            let mut responses = Vec::with_capacity(batch.len());
            for item in batch {
                responses.push(self.handle_single(item).await);
            }
            return Value::Array(responses);
        }

        self.handle_single(value).await
    }

    async fn handle_single(&self, value: Value) -> Value {
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                return to_value_or_default(JsonRpcResponse::error(
                    None,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        to_value_or_default(self.dispatch(request).await)
    }

    /// Dispatch a parsed JSON-RPC request to the correct method handler.
    pub async fn dispatch(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        if req.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                req.id,
                INVALID_REQUEST,
                "Invalid JSON-RPC version, expected \"2.0\"",
            );
        }

        let id = req.id.clone();
        let params = req.params.unwrap_or(Value::Object(Default::default()));

        tracing::debug!(method = %req.method, "RPC call");
        match self.route(&req.method, params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => err.to_response(id),
        }
    }

    async fn route(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            // ----- Tasks -----
            "tasks.start" => {
                let p = parse_params(params)?;
                to_json(methods::tasks::start(&self.state, p).await?)
            }
            "tasks.continue" => {
                let p = parse_params(params)?;
                to_json(methods::tasks::resume(&self.state, p).await?)
            }
            "tasks.cancel" => {
                let p = parse_params(params)?;
                to_json(methods::tasks::cancel(&self.state, p).await?)
            }
            "tasks.list" => to_json(methods::tasks::list(&self.state).await?),

            // ----- Workflows -----
            "workflows.list" => to_json(methods::workflows::list(&self.state).await?),
            "workflows.get" => {
                let p = parse_params(params)?;
                to_json(methods::workflows::get(&self.state, p).await?)
            }

            _ => Err(RpcError::MethodNotFound(method.to_string())),
        }
    }

    /// All supported method names, for discovery endpoints.
    pub fn method_list(&self) -> Vec<&'static str> {
        vec![
            "tasks.start",
            "tasks.continue",
            "tasks.cancel",
            "tasks.list",
            "workflows.list",
            "workflows.get",
        ]
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::Internal(format!("Failed to serialize result: {}", e)))
}

fn to_value_or_default(response: JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or_default()
}

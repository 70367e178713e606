//! Transport-agnostic JSON-RPC 2.0 layer for Tasklet.
//!
//! Exposes the task controller and the workflow registry as JSON-RPC
//! methods. Nothing here depends on an HTTP framework, so the same router
//! serves:
//!
//! - **HTTP**: via the axum endpoint at `/api/rpc`
//! - **CLI**: `tasklet rpc --method ...` dispatches in-process
//!
//! # Example
//!
//! ```ignore
//! use tasklet_core::rpc::RpcRouter;
//!
//! let router = RpcRouter::new(app_state);
//! let response = router.handle_request(r#"{
//!     "jsonrpc": "2.0",
//!     "id": 1,
//!     "method": "tasks.start",
//!     "params": { "workflow_id": "echo", "user_input": "hi" }
//! }"#).await;
//! ```

pub mod error;
pub mod methods;
pub mod router;
pub mod types;

pub use error::RpcError;
pub use router::RpcRouter;
pub use types::{JsonRpcRequest, JsonRpcResponse};

//! Tasklet Core: suspendable workflow tasks over stateless request/response.
//!
//! A workflow runs as a task that can pause mid-execution to ask the caller
//! for input. Each pause is surfaced as a message envelope; the caller
//! resumes the task by sending a reply keyed by the task id. This crate
//! holds the whole engine and has **no HTTP framework dependency** by
//! default, so it can sit behind:
//!
//! - HTTP servers (via `tasklet-server`)
//! - CLI tools (via `tasklet-cli`)
//! - any other transport through the JSON-RPC router in [`rpc`]
//!
//! # Architecture
//!
//! ```text
//! StartRequest ──► TaskController ──► WorkflowRegistry (name → descriptor)
//!                        │
//!                        ├──► ExecutionSession (workflow future + channels)
//!                        │          │
//!                        │          └──► SessionStore (task_id → session)
//!                        ▼
//!                    Envelope  ◄── ContinueRequest
//! ```
//!
//! # Feature Flags
//!
//! - `axum`: Enables `IntoResponse` impls on `EngineError` and `Envelope`.

pub mod config;
pub mod controller;
pub mod envelope;
pub mod error;
pub mod rpc;
pub mod session;
pub mod state;
pub mod workflow;

// Convenience re-exports
pub use config::{DriveMode, EngineConfig};
pub use controller::{ContinueRequest, StartRequest, TaskController};
pub use envelope::{Envelope, EnvelopeStatus, FieldKind, FormField, InteractionRequest, Message};
pub use error::EngineError;
pub use session::{SessionInfo, SessionState, SessionStore};
pub use state::{AppState, AppStateInner};
pub use workflow::{
    Param, Workflow, WorkflowArgs, WorkflowContext, WorkflowDescriptor, WorkflowError,
    WorkflowRegistry,
};

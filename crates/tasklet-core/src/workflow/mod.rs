//! Workflow contract: what a workflow plugin implements so the controller
//! can drive it uniformly.
//!
//! A workflow is an async body that receives its declared arguments and a
//! [`WorkflowContext`]. Awaiting [`WorkflowContext::progress`] or
//! [`WorkflowContext::ask`] are its only suspension points; the compiler-built
//! future keeps locals and position alive between HTTP calls.
//!
//! ```ignore
//! let descriptor = WorkflowDescriptor::from_fn("echo_with_confirm", |args, ctx| async move {
//!     ctx.progress("got", args.input()).await?;
//!     let reply = ctx.ask(
//!         InteractionRequest::new("Confirm", "Proceed?")
//!             .field(FormField::select("confirm", "Proceed?", ["Yes", "No"])),
//!     ).await?;
//!     Ok(json!({ "confirmed": reply["confirm"] }))
//! })
//! .param(Param::Input);
//! ```

pub mod builtin;
pub mod context;
pub mod registry;

pub use context::WorkflowContext;
pub use registry::{WorkflowRegistry, WorkflowSummary};

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed vocabulary of arguments a workflow may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    /// Free-text user input; required and non-blank when declared.
    Input,
    /// Model selector; passed through when declared.
    Model,
    /// The task identifier; always available to the body.
    TaskId,
}

impl Param {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Model => "model",
            Self::TaskId => "task_id",
        }
    }
}

/// Arguments derived by the controller from the start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowArgs {
    pub task_id: String,
    pub input: Option<String>,
    pub model: Option<String>,
}

impl WorkflowArgs {
    /// The free-text input, or `""` when the workflow did not declare it.
    pub fn input(&self) -> &str {
        self.input.as_deref().unwrap_or("")
    }
}

/// Failure raised inside a workflow body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid interaction request: {0}")]
    InvalidRequest(String),

    /// The session owning this body is gone (expired, cancelled or removed).
    #[error("task was detached from its session")]
    Detached,
}

impl WorkflowError {
    pub fn failed(msg: impl fmt::Display) -> Self {
        Self::Failed(msg.to_string())
    }
}

/// A suspendable workflow body.
#[async_trait]
pub trait Workflow: Send + Sync + 'static {
    async fn run(&self, args: WorkflowArgs, ctx: WorkflowContext) -> Result<Value, WorkflowError>;
}

/// Adapter turning an async closure into a [`Workflow`].
pub struct FnWorkflow<F>(F);

#[async_trait]
impl<F, Fut> Workflow for FnWorkflow<F>
where
    F: Fn(WorkflowArgs, WorkflowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, WorkflowError>> + Send + 'static,
{
    async fn run(&self, args: WorkflowArgs, ctx: WorkflowContext) -> Result<Value, WorkflowError> {
        (self.0)(args, ctx).await
    }
}

/// A registered workflow: name, declared parameters and entrypoint.
#[derive(Clone)]
pub struct WorkflowDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub params: BTreeSet<Param>,
    entrypoint: Arc<dyn Workflow>,
}

impl WorkflowDescriptor {
    pub fn new(name: impl Into<String>, workflow: impl Workflow) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            description: String::new(),
            params: BTreeSet::from([Param::TaskId]),
            entrypoint: Arc::new(workflow),
        }
    }

    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(WorkflowArgs, WorkflowContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, WorkflowError>> + Send + 'static,
    {
        Self::new(name, FnWorkflow(f))
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.insert(param);
        self
    }

    pub fn requires(&self, param: Param) -> bool {
        self.params.contains(&param)
    }

    pub fn entrypoint(&self) -> Arc<dyn Workflow> {
        Arc::clone(&self.entrypoint)
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            params: self.params.iter().copied().collect(),
        }
    }
}

impl fmt::Debug for WorkflowDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowDescriptor")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

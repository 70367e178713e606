//! Workflow registry: name → descriptor lookup.
//!
//! Read-mostly: filled at startup, then only queried by the controller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{builtin, Param, WorkflowDescriptor};
use crate::error::EngineError;

/// Catalog entry for a workflow, without its entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub params: Vec<Param>,
}

/// In-memory registry of workflows.
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<String, WorkflowDescriptor>>,
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// A registry pre-filled with the built-in workflows.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for descriptor in builtin::builtin_workflows() {
            if let Err(e) = registry.register(descriptor) {
                tracing::warn!("Skipping built-in workflow: {}", e);
            }
        }
        registry
    }

    /// Register a workflow. Names must be unique and made of
    /// `[A-Za-z0-9_-]`.
    pub fn register(&self, descriptor: WorkflowDescriptor) -> Result<(), EngineError> {
        validate_name(&descriptor.name)?;

        let mut workflows = self
            .workflows
            .write()
            .map_err(|e| EngineError::Internal(format!("Registry lock poisoned: {}", e)))?;
        if workflows.contains_key(&descriptor.name) {
            return Err(EngineError::Conflict(format!(
                "workflow '{}' is already registered",
                descriptor.name
            )));
        }

        tracing::debug!(workflow = %descriptor.name, "Registered workflow");
        workflows.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<WorkflowDescriptor> {
        self.workflows
            .read()
            .ok()
            .and_then(|w| w.get(name).cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workflows
            .read()
            .map(|w| w.contains_key(name))
            .unwrap_or(false)
    }

    /// All workflows, sorted by title then name.
    pub fn list(&self) -> Vec<WorkflowSummary> {
        let mut summaries: Vec<WorkflowSummary> = self
            .workflows
            .read()
            .map(|w| w.values().map(WorkflowDescriptor::summary).collect())
            .unwrap_or_default();
        summaries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.name.cmp(&b.name)));
        summaries
    }

    pub fn len(&self) -> usize {
        self.workflows.read().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.is_empty() {
        return Err(EngineError::Validation(
            "workflow name must not be empty".to_string(),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(EngineError::Validation(format!(
            "workflow name '{}' contains invalid character {:?}",
            name, bad
        )));
    }
    Ok(())
}

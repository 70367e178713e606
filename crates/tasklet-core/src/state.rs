//! Shared application state for every transport.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::controller::TaskController;
use crate::workflow::WorkflowRegistry;

/// Shared state accessible by API handlers, RPC methods and the CLI.
pub struct AppStateInner {
    pub config: EngineConfig,
    pub registry: Arc<WorkflowRegistry>,
    pub controller: TaskController,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(config: EngineConfig, registry: WorkflowRegistry) -> Self {
        let registry = Arc::new(registry);
        Self {
            controller: TaskController::new(Arc::clone(&registry), config.clone()),
            registry,
            config,
        }
    }

    /// State with the built-in workflows registered.
    pub fn with_builtins(config: EngineConfig) -> Self {
        Self::new(config, WorkflowRegistry::with_builtins())
    }
}

//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses the
//! tasklet-core engine through `AppState`.

pub mod rpc;
pub mod server;
pub mod workflow;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tasklet_core::state::{AppState, AppStateInner};
use tasklet_core::EngineConfig;

/// `<config_dir>/tasklet/config.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tasklet").join("config.yaml"))
}

/// Load the engine config.
///
/// An explicit path must exist. Without one, the default location is used
/// when present, otherwise the built-in defaults.
pub fn load_config(explicit: Option<&str>) -> Result<EngineConfig, String> {
    resolve_config(explicit.map(Path::new), default_config_path().as_deref())
}

fn resolve_config(
    explicit: Option<&Path>,
    fallback: Option<&Path>,
) -> Result<EngineConfig, String> {
    if let Some(path) = explicit {
        return EngineConfig::from_file(path).map_err(|e| e.to_string());
    }
    match fallback {
        Some(path) if path.is_file() => {
            tracing::debug!("Using config {}", path.display());
            EngineConfig::from_file(path).map_err(|e| e.to_string())
        }
        _ => Ok(EngineConfig::default()),
    }
}

/// Build a shared `AppState` with the built-in workflows registered.
///
/// Mirrors `tasklet_server::create_app_state` for commands that never bind
/// a socket.
pub fn init_state(config: EngineConfig) -> AppState {
    Arc::new(AppStateInner::with_builtins(config))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

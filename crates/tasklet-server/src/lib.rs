//! Tasklet Server: HTTP adapter for the Tasklet engine.
//!
//! Exposes the start/continue task operations, the workflow registry,
//! session diagnostics and the JSON-RPC router over axum. All engine
//! behavior lives in `tasklet-core`; this crate only maps HTTP onto it.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tasklet_core::state::{AppState, AppStateInner};
use tasklet_core::EngineConfig;

/// Configuration for the Tasklet HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5005,
            engine: EngineConfig::default(),
        }
    }
}

/// Create a shared `AppState` with the built-in workflows registered.
pub fn create_app_state(engine: EngineConfig) -> AppState {
    let state: AppState = Arc::new(AppStateInner::with_builtins(engine));
    tracing::info!("Registered {} workflows", state.registry.len());
    state
}

/// Build the full axum application for `state`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::api_router())
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install the global tracing subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tasklet_core=info,tasklet_server=info,tower_http=info".into()
            }),
        )
        .try_init();
}

/// Start the HTTP server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    init_tracing();

    tracing::info!(
        "Starting Tasklet server on {}:{} (drive mode: {})",
        config.host,
        config.port,
        config.engine.drive_mode.as_str()
    );

    let state = create_app_state(config.engine.clone());
    start_server_with_state(config, state).await
}

/// Start the HTTP server with a pre-built `AppState`.
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    // Expired sessions are swept for the lifetime of the process.
    let _sweeper = state.controller.spawn_sweeper();

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("Tasklet server listening on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "tasklet-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

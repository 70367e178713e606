pub mod rpc;
pub mod tasks;
pub mod workflows;

use axum::Router;

use tasklet_core::state::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api", tasks::router())
        .nest("/api", workflows::router())
        .nest("/api/rpc", rpc::router())
}

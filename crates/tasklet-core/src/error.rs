//! Core error type for the Tasklet engine.
//!
//! `EngineError` is used throughout the core (registry, store, controller,
//! RPC). The controller never returns it directly: every failure is folded
//! into an error [`Envelope`](crate::envelope::Envelope). When the `axum`
//! feature is enabled, it also implements `IntoResponse`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Workflow failed: {0}")]
    Workflow(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable tag for the error class, echoed on the wire as `error_kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::UnknownWorkflow(_) => "unknown_workflow",
            EngineError::UnknownTask(_) => "unknown_task",
            EngineError::Conflict(_) => "conflict",
            EngineError::Workflow(_) => "workflow",
            EngineError::Internal(_) => "internal",
        }
    }

    /// HTTP status code for this error class.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Validation(_) | EngineError::UnknownWorkflow(_) => 400,
            EngineError::UnknownTask(_) => 404,
            EngineError::Conflict(_) => 409,
            EngineError::Workflow(_) | EngineError::Internal(_) => 500,
        }
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for EngineError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "status": "error",
            "error": self.to_string(),
            "error_kind": self.kind(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_error_class() {
        assert_eq!(EngineError::Validation("x".into()).status_code(), 400);
        assert_eq!(EngineError::UnknownWorkflow("x".into()).status_code(), 400);
        assert_eq!(EngineError::UnknownTask("x".into()).status_code(), 404);
        assert_eq!(EngineError::Conflict("x".into()).status_code(), 409);
        assert_eq!(EngineError::Workflow("x".into()).status_code(), 500);
    }

    #[test]
    fn test_unknown_task_message_is_distinguishable() {
        let err = EngineError::UnknownTask("abc".into());
        assert!(err.to_string().starts_with("Unknown task:"));
        assert_eq!(err.kind(), "unknown_task");
    }
}

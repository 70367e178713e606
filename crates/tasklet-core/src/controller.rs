//! Task controller: drives workflows through start and continue calls.
//!
//! Per task: `not started → running → (awaiting input ⇄ running) →
//! succeeded | failed`. Reaching a terminal state removes the session.
//! Neither entry point returns a `Result`: every outcome, including bad
//! requests, is folded into an [`Envelope`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::envelope::{payload_from_value, Envelope, Message, Reply};
use crate::error::EngineError;
use crate::session::{ExecutionSession, SessionInfo, SessionStore, Step, SuspendPoint};
use crate::workflow::{Param, WorkflowArgs, WorkflowDescriptor, WorkflowError, WorkflowRegistry};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default, alias = "workflowId")]
    pub workflow_id: String,
    #[serde(default, alias = "userInput")]
    pub user_input: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl StartRequest {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            ..Default::default()
        }
    }

    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.user_input = Some(input.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContinueRequest {
    #[serde(default, alias = "taskId")]
    pub task_id: String,
    /// Reply object keyed by field name. `null` or absent means `{}`.
    #[serde(default, alias = "reply", alias = "userInput")]
    pub user_input: Option<Value>,
}

impl ContinueRequest {
    pub fn new(task_id: impl Into<String>, reply: Value) -> Self {
        Self {
            task_id: task_id.into(),
            user_input: Some(reply),
        }
    }
}

pub struct TaskController {
    registry: Arc<WorkflowRegistry>,
    sessions: SessionStore,
    config: EngineConfig,
}

impl TaskController {
    pub fn new(registry: Arc<WorkflowRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            sessions: SessionStore::new(),
            config,
        }
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a workflow and drive it to its first stopping point.
    pub async fn start(&self, req: StartRequest) -> Envelope {
        // The id is minted up front so even a rejected start can be correlated.
        let task_id = uuid::Uuid::new_v4().to_string();
        let fail = |err: EngineError| {
            tracing::warn!(task_id = %task_id, workflow = %req.workflow_id, "Start rejected: {}", err);
            Envelope::failure(Some(task_id.clone()), err)
        };

        // 1. Resolve the workflow
        let workflow_id = req.workflow_id.trim();
        if workflow_id.is_empty() {
            return fail(EngineError::Validation("workflow_id is required".into()));
        }
        let Some(descriptor) = self.registry.get(workflow_id) else {
            return fail(EngineError::UnknownWorkflow(format!(
                "no workflow named '{}'",
                workflow_id
            )));
        };

        // 2. Derive arguments from the declared parameters
        let args = match self.derive_args(&descriptor, &task_id, &req) {
            Ok(args) => args,
            Err(err) => return fail(err),
        };

        // 3. Run until the first suspension point or completion
        tracing::info!(task_id = %task_id, workflow = %descriptor.name, "Task started");
        let mut session = ExecutionSession::spawn(&descriptor, args);
        match session.drive(self.config.drive_mode).await {
            Step::Completed { outcome, messages } => {
                self.finish(&task_id, &descriptor.name, outcome, messages)
            }
            Step::Suspended { point, messages } => {
                // 4. Only suspended work is stored
                if let Err(err) = self.sessions.create(session).await {
                    return fail(err).with_messages(messages);
                }
                suspended(&task_id, &descriptor.name, point, messages)
            }
        }
    }

    /// Resume a suspended task with the caller's reply.
    pub async fn continue_task(&self, req: ContinueRequest) -> Envelope {
        let task_id = req.task_id.trim().to_string();
        if task_id.is_empty() {
            return Envelope::failure(None, EngineError::Validation("task_id is required".into()));
        }
        let fail = |err: EngineError| {
            tracing::warn!(task_id = %task_id, "Continue rejected: {}", err);
            Envelope::failure(Some(task_id.clone()), err)
        };

        let reply: Reply = match req.user_input {
            None | Some(Value::Null) => Reply::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return fail(EngineError::Validation(format!(
                    "reply must be a JSON object keyed by field name, got {}",
                    other
                )))
            }
        };

        let Some(handle) = self.sessions.get(&task_id).await else {
            return fail(EngineError::UnknownTask(format!(
                "no suspended task with id '{}' (it may have finished, expired or never existed)",
                task_id
            )));
        };
        let Ok(mut session) = handle.try_lock_owned() else {
            return fail(EngineError::Conflict(format!(
                "task '{}' is already being resumed",
                task_id
            )));
        };

        let workflow = session.workflow().to_string();
        tracing::info!(task_id = %task_id, workflow = %workflow, "Task resumed");

        // The drive runs on its own task so a caller that goes away mid-step
        // cannot strand the session between suspension points.
        let sessions = self.sessions.clone();
        let mode = self.config.drive_mode;
        let driven_id = task_id.clone();
        let driver = tokio::spawn(async move {
            let step = session.resume(reply, mode).await;
            if let Ok(Step::Completed { .. }) = &step {
                sessions.remove(&driven_id).await;
            }
            drop(session);
            step
        });

        match driver.await {
            Ok(Ok(Step::Suspended { point, messages })) => {
                suspended(&task_id, &workflow, point, messages)
            }
            Ok(Ok(Step::Completed { outcome, messages })) => {
                self.finish(&task_id, &workflow, outcome, messages)
            }
            Ok(Err(err)) => fail(err),
            Err(e) => {
                self.sessions.remove(&task_id).await;
                fail(EngineError::Internal(format!("resume of task '{}' aborted: {}", task_id, e)))
            }
        }
    }

    /// Drop a suspended task. Returns whether a session was removed.
    pub async fn cancel(&self, task_id: &str) -> bool {
        let removed = self.sessions.remove(task_id).await;
        if removed {
            tracing::info!(task_id = %task_id, "Task cancelled");
        }
        removed
    }

    pub async fn list(&self) -> Vec<SessionInfo> {
        self.sessions.list().await
    }

    /// Start the background expiry sweeper, unless expiry is disabled.
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let ttl = self.config.session_ttl()?;
        tracing::info!(
            ttl_secs = ttl.as_secs(),
            interval_secs = self.config.sweep_interval().as_secs(),
            "Session sweeper started"
        );
        Some(
            self.sessions
                .spawn_sweeper(ttl, self.config.sweep_interval()),
        )
    }

    fn derive_args(
        &self,
        descriptor: &WorkflowDescriptor,
        task_id: &str,
        req: &StartRequest,
    ) -> Result<WorkflowArgs, EngineError> {
        let input = if descriptor.requires(Param::Input) {
            match req.user_input.as_deref() {
                Some(s) if !s.trim().is_empty() => Some(s.to_string()),
                _ => {
                    return Err(EngineError::Validation(format!(
                        "workflow '{}' requires a non-blank user_input",
                        descriptor.name
                    )))
                }
            }
        } else {
            None
        };

        let model = if descriptor.requires(Param::Model) {
            req.model
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .or_else(|| self.config.default_model.clone())
        } else {
            None
        };

        Ok(WorkflowArgs {
            task_id: task_id.to_string(),
            input,
            model,
        })
    }

    fn finish(
        &self,
        task_id: &str,
        workflow: &str,
        outcome: Result<Value, WorkflowError>,
        messages: Vec<Message>,
    ) -> Envelope {
        let envelope = match outcome {
            Ok(value) => {
                tracing::info!(task_id = %task_id, workflow = %workflow, "Task completed");
                Envelope::success(Some(task_id.to_string()), payload_from_value(value))
            }
            Err(err) => {
                tracing::error!(task_id = %task_id, workflow = %workflow, "Task failed: {}", err);
                Envelope::failure(
                    Some(task_id.to_string()),
                    EngineError::Workflow(err.to_string()),
                )
            }
        };
        envelope.with_messages(messages)
    }
}

fn suspended(task_id: &str, workflow: &str, point: SuspendPoint, messages: Vec<Message>) -> Envelope {
    let envelope = match point {
        SuspendPoint::Progress(message) => {
            tracing::debug!(task_id = %task_id, workflow = %workflow, "Task suspended on progress");
            Envelope::progress(task_id, message)
        }
        SuspendPoint::Interaction(request) => {
            tracing::info!(
                task_id = %task_id,
                workflow = %workflow,
                fields = request.fields.len(),
                "Task awaiting input"
            );
            Envelope::interaction(task_id, request)
        }
    };
    envelope.with_messages(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriveMode;
    use crate::envelope::{EnvelopeStatus, FormField, InteractionRequest};
    use crate::session::SessionState;
    use crate::workflow::WorkflowContext;
    use serde_json::json;
    use std::time::Duration;

    fn controller() -> TaskController {
        controller_with(EngineConfig::default())
    }

    fn controller_with(config: EngineConfig) -> TaskController {
        let registry = WorkflowRegistry::with_builtins();
        registry
            .register(WorkflowDescriptor::from_fn("explodes", explodes))
            .unwrap();
        registry
            .register(WorkflowDescriptor::from_fn("panics", panics))
            .unwrap();
        registry
            .register(WorkflowDescriptor::from_fn("bad_form", bad_form))
            .unwrap();
        registry
            .register(WorkflowDescriptor::from_fn("plain", plain))
            .unwrap();
        registry
            .register(WorkflowDescriptor::from_fn("slow_pair", slow_pair))
            .unwrap();
        TaskController::new(Arc::new(registry), config)
    }

    async fn explodes(_: WorkflowArgs, _: WorkflowContext) -> Result<Value, WorkflowError> {
        Err(WorkflowError::failed("upstream model unavailable"))
    }

    async fn panics(_: WorkflowArgs, ctx: WorkflowContext) -> Result<Value, WorkflowError> {
        ctx.progress("before", "about to fail").await?;
        panic!("index out of bounds");
    }

    async fn bad_form(_: WorkflowArgs, ctx: WorkflowContext) -> Result<Value, WorkflowError> {
        ctx.ask(
            InteractionRequest::new("broken", "")
                .field(FormField::select("pick", "Pick", Vec::<String>::new())),
        )
        .await?;
        Ok(Value::Null)
    }

    async fn plain(args: WorkflowArgs, _: WorkflowContext) -> Result<Value, WorkflowError> {
        Ok(json!(args.task_id.len()))
    }

    async fn slow_pair(_: WorkflowArgs, ctx: WorkflowContext) -> Result<Value, WorkflowError> {
        let first = ctx
            .ask(InteractionRequest::new("q1", "").field(FormField::text("a", "A")))
            .await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = ctx
            .ask(InteractionRequest::new("q2", "").field(FormField::text("b", "B")))
            .await?;
        Ok(json!({ "a": first["a"], "b": second["b"] }))
    }

    fn json_of(envelope: &Envelope) -> Value {
        envelope.to_json()
    }

    #[tokio::test]
    async fn test_blank_input_never_creates_a_session() {
        let controller = controller();
        for input in [None, Some(""), Some("   \n")] {
            let mut req = StartRequest::new("echo_with_confirm");
            req.user_input = input.map(str::to_string);

            let envelope = controller.start(req).await;
            assert_eq!(envelope.error().unwrap().kind(), "validation");
            assert!(envelope.task_id.is_some());
        }
        assert!(controller.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_and_unknown_workflow() {
        let controller = controller();

        let envelope = controller.start(StartRequest::new("  ")).await;
        assert_eq!(envelope.error().unwrap().kind(), "validation");

        let envelope = controller.start(StartRequest::new("nope").input("hi")).await;
        assert_eq!(envelope.error().unwrap().kind(), "unknown_workflow");
        assert!(controller.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_task_is_idempotent() {
        let controller = controller();
        for _ in 0..2 {
            let envelope = controller
                .continue_task(ContinueRequest::new("missing", json!({})))
                .await;
            let err = envelope.error().unwrap();
            assert_eq!(err.kind(), "unknown_task");
            assert!(err.to_string().contains("missing"));
        }
    }

    #[tokio::test]
    async fn test_immediate_completion_stores_nothing() {
        let controller = controller();
        let envelope = controller.start(StartRequest::new("echo").input("hello")).await;

        assert_eq!(envelope.status(), EnvelopeStatus::Success);
        let body = json_of(&envelope);
        assert_eq!(body["echo"], "hello");
        assert!(controller.sessions().is_empty().await);

        // Non-object return values land under `data`.
        let body = json_of(&controller.start(StartRequest::new("plain")).await);
        assert_eq!(body["data"], 36);
    }

    #[tokio::test]
    async fn test_echo_with_confirm_round_trip() {
        let controller = controller();

        let first = controller
            .start(StartRequest::new("echo_with_confirm").input("hi"))
            .await;
        assert_eq!(first.status(), EnvelopeStatus::AwaitingInput);
        let body = json_of(&first);
        let task_id = body["task_id"].as_str().unwrap().to_string();
        assert_eq!(body["form_elements"][0]["name"], "confirm");
        assert_eq!(body["form_elements"][0]["options"], json!(["Yes", "No"]));
        assert_eq!(body["messages"][0], json!({"title": "got", "body": "hi"}));
        assert!(controller.sessions().contains(&task_id).await);

        let second = controller
            .continue_task(ContinueRequest::new(&task_id, json!({"confirm": "Yes"})))
            .await;
        assert_eq!(second.status(), EnvelopeStatus::Success);
        assert_eq!(json_of(&second)["confirmed"], "Yes");
        assert!(!controller.sessions().contains(&task_id).await);

        let third = controller
            .continue_task(ContinueRequest::new(&task_id, json!({"confirm": "Yes"})))
            .await;
        assert_eq!(third.error().unwrap().kind(), "unknown_task");
    }

    #[tokio::test]
    async fn test_failing_body_leaves_no_session() {
        let controller = controller();

        let envelope = controller.start(StartRequest::new("explodes")).await;
        let err = envelope.error().unwrap();
        assert_eq!(err.kind(), "workflow");
        assert!(err.to_string().contains("upstream model unavailable"));
        assert!(controller.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_panicking_body_is_a_workflow_error() {
        let controller = controller();

        let envelope = controller.start(StartRequest::new("panics")).await;
        assert_eq!(envelope.error().unwrap().kind(), "workflow");
        assert_eq!(envelope.messages.len(), 1);
        assert!(controller.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_interaction_request_fails_task() {
        let controller = controller();

        let envelope = controller.start(StartRequest::new("bad_form")).await;
        let err = envelope.error().unwrap();
        assert_eq!(err.kind(), "workflow");
        assert!(err.to_string().contains("no options"));
        assert!(controller.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_bad_reply_keeps_task_suspended() {
        let controller = controller();
        let first = controller
            .start(StartRequest::new("echo_with_confirm").input("hi"))
            .await;
        let task_id = first.task_id.clone().unwrap();

        let bad = controller
            .continue_task(ContinueRequest::new(&task_id, json!({"confirm": "Maybe"})))
            .await;
        assert_eq!(bad.error().unwrap().kind(), "validation");

        let not_object = controller
            .continue_task(ContinueRequest::new(&task_id, json!("Yes")))
            .await;
        assert_eq!(not_object.error().unwrap().kind(), "validation");
        assert!(controller.sessions().contains(&task_id).await);

        let good = controller
            .continue_task(ContinueRequest::new(&task_id, json!({"confirm": "No"})))
            .await;
        assert_eq!(json_of(&good)["confirmed"], "No");
    }

    #[tokio::test]
    async fn test_concurrent_resume_is_rejected() {
        let controller = controller();
        let first = controller
            .start(StartRequest::new("echo_with_confirm").input("hi"))
            .await;
        let task_id = first.task_id.clone().unwrap();

        let handle = controller.sessions().get(&task_id).await.unwrap();
        let guard = handle.lock().await;
        let envelope = controller
            .continue_task(ContinueRequest::new(&task_id, json!({"confirm": "Yes"})))
            .await;
        drop(guard);

        assert_eq!(envelope.error().unwrap().kind(), "conflict");
        assert!(controller.sessions().contains(&task_id).await);
    }

    #[tokio::test]
    async fn test_locals_survive_between_turns() {
        let mut config = EngineConfig::default();
        config.default_model = Some("local/llama".into());
        let controller = controller_with(config);

        let first = controller
            .start(StartRequest::new("draft_note").input("buy milk"))
            .await;
        assert_eq!(first.status(), EnvelopeStatus::AwaitingInput);
        let task_id = first.task_id.clone().unwrap();

        let done = controller
            .continue_task(ContinueRequest::new(
                &task_id,
                json!({"title": "Groceries", "keep": "Yes"}),
            ))
            .await;
        let body = json_of(&done);
        assert_eq!(body["status"], "success");
        assert_eq!(body["note"], "buy milk");
        assert_eq!(body["title"], "Groceries");
        assert_eq!(body["model"], "local/llama");
        assert_eq!(body["messages"][0]["title"], "Saved");
    }

    #[tokio::test]
    async fn test_each_message_mode_returns_progress_envelopes() {
        let mut config = EngineConfig::default();
        config.drive_mode = DriveMode::EachMessage;
        let controller = controller_with(config);

        let first = controller
            .start(StartRequest::new("echo_with_confirm").input("hi"))
            .await;
        assert_eq!(first.status(), EnvelopeStatus::InProgress);
        let body = json_of(&first);
        assert_eq!(body["message"], json!({"title": "got", "body": "hi"}));
        let task_id = first.task_id.clone().unwrap();

        let second = controller
            .continue_task(ContinueRequest {
                task_id: task_id.clone(),
                user_input: None,
            })
            .await;
        assert_eq!(second.status(), EnvelopeStatus::AwaitingInput);

        let third = controller
            .continue_task(ContinueRequest::new(&task_id, json!({"confirm": "Yes"})))
            .await;
        assert_eq!(third.status(), EnvelopeStatus::Success);
    }

    #[tokio::test]
    async fn test_cancel_and_expiry() {
        let controller = controller();
        let a = controller
            .start(StartRequest::new("echo_with_confirm").input("a"))
            .await;
        let b = controller
            .start(StartRequest::new("echo_with_confirm").input("b"))
            .await;
        assert_eq!(controller.list().await.len(), 2);

        let a_id = a.task_id.unwrap();
        assert!(controller.cancel(&a_id).await);
        assert!(!controller.cancel(&a_id).await);

        let evicted = controller
            .sessions()
            .sweep_expired(std::time::Duration::ZERO)
            .await;
        assert_eq!(evicted, vec![b.task_id.unwrap()]);

        let envelope = controller
            .continue_task(ContinueRequest::new(&a_id, json!({"confirm": "Yes"})))
            .await;
        assert_eq!(envelope.error().unwrap().kind(), "unknown_task");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_continue_still_reaches_next_suspension() {
        let controller = controller();
        let first = controller.start(StartRequest::new("slow_pair")).await;
        assert_eq!(first.status(), EnvelopeStatus::AwaitingInput);
        let task_id = first.task_id.clone().unwrap();

        let cut_short = tokio::time::timeout(
            Duration::from_millis(20),
            controller.continue_task(ContinueRequest::new(&task_id, json!({"a": "one"}))),
        )
        .await;
        assert!(cut_short.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let listed = controller.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].workflow, "slow_pair");
        assert_eq!(listed[0].state, SessionState::AwaitingInput);

        let done = controller
            .continue_task(ContinueRequest::new(&task_id, json!({"b": "two"})))
            .await;
        assert_eq!(done.status(), EnvelopeStatus::Success);
        assert_eq!(json_of(&done)["a"], "one");
        assert_eq!(json_of(&done)["b"], "two");
        assert!(controller.sessions().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_expires_abandoned_tasks() {
        let mut config = EngineConfig::default();
        config.session_ttl_secs = 30;
        config.sweep_interval_secs = 5;
        let controller = controller_with(config);

        let first = controller
            .start(StartRequest::new("echo_with_confirm").input("hi"))
            .await;
        let task_id = first.task_id.clone().unwrap();

        let sweeper = controller.spawn_sweeper().unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(controller.sessions().contains(&task_id).await);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!controller.sessions().contains(&task_id).await);
        let envelope = controller
            .continue_task(ContinueRequest::new(&task_id, json!({"confirm": "Yes"})))
            .await;
        assert_eq!(envelope.error().unwrap().kind(), "unknown_task");
        sweeper.abort();

        let mut config = EngineConfig::default();
        config.session_ttl_secs = 0;
        assert!(controller_with(config).spawn_sweeper().is_none());
    }

    #[test]
    fn test_request_aliases() {
        let req: StartRequest =
            serde_json::from_value(json!({"workflowId": "echo", "userInput": "x"})).unwrap();
        assert_eq!(req.workflow_id, "echo");
        assert_eq!(req.user_input.as_deref(), Some("x"));

        let req: ContinueRequest =
            serde_json::from_value(json!({"task_id": "t", "reply": {"a": "b"}})).unwrap();
        assert_eq!(req.user_input, Some(json!({"a": "b"})));
    }
}

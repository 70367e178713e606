//! Execution session: one in-flight workflow invocation and its suspended
//! state.
//!
//! The workflow body runs as its own tokio task. Between calls it is parked
//! on a oneshot inside [`WorkflowContext`](crate::workflow::WorkflowContext),
//! so locals and position survive without any explicit state machine. The
//! session owns the receiving ends: the event channel and the resume handle
//! of the current suspension point.

pub mod store;

pub use store::{SessionHandle, SessionStore};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use crate::config::DriveMode;
use crate::envelope::{InteractionRequest, Message, Reply};
use crate::error::EngineError;
use crate::workflow::context::WorkflowEvent;
use crate::workflow::{WorkflowArgs, WorkflowContext, WorkflowDescriptor, WorkflowError};

/// Where a suspended session is waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspendPoint {
    Progress(Message),
    Interaction(InteractionRequest),
}

/// Outcome of driving a session forward.
#[derive(Debug)]
pub enum Step {
    Suspended {
        point: SuspendPoint,
        messages: Vec<Message>,
    },
    Completed {
        outcome: Result<Value, WorkflowError>,
        messages: Vec<Message>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Currently being driven by a start/continue call.
    Running,
    AwaitingInput,
    /// Parked on a progress message (`each_message` mode).
    AwaitingAck,
    Finished,
}

/// Diagnostic view of a stored session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub task_id: String,
    pub workflow: String,
    pub created_at: DateTime<Utc>,
    pub idle_secs: u64,
    pub state: SessionState,
}

struct Pending {
    resume: oneshot::Sender<Reply>,
    request: Option<InteractionRequest>,
}

pub struct ExecutionSession {
    task_id: String,
    workflow: String,
    created_at: DateTime<Utc>,
    last_active: Instant,
    events: mpsc::Receiver<WorkflowEvent>,
    handle: JoinHandle<Result<Value, WorkflowError>>,
    pending: Option<Pending>,
    finished: bool,
}

impl ExecutionSession {
    /// Invoke the workflow entrypoint on its own task. The body runs until
    /// its first emission and then waits for [`drive`](Self::drive).
    pub fn spawn(descriptor: &WorkflowDescriptor, args: WorkflowArgs) -> Self {
        let (events_tx, events_rx) = mpsc::channel(1);
        let task_id = args.task_id.clone();
        let ctx = WorkflowContext::new(task_id.clone(), events_tx);
        let workflow = descriptor.entrypoint();
        let span = tracing::info_span!("workflow", task_id = %task_id, workflow = %descriptor.name);
        let handle = tokio::spawn(async move { workflow.run(args, ctx).await }.instrument(span));

        Self {
            task_id,
            workflow: descriptor.name.clone(),
            created_at: Utc::now(),
            last_active: Instant::now(),
            events: events_rx,
            handle,
            pending: None,
            finished: false,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn state(&self) -> SessionState {
        match &self.pending {
            _ if self.finished => SessionState::Finished,
            Some(Pending {
                request: Some(_), ..
            }) => SessionState::AwaitingInput,
            Some(Pending { request: None, .. }) => SessionState::AwaitingAck,
            None => SessionState::Running,
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            task_id: self.task_id.clone(),
            workflow: self.workflow.clone(),
            created_at: self.created_at,
            idle_secs: self.idle_for().as_secs(),
            state: self.state(),
        }
    }

    /// Run the body until the next suspension point or its end.
    pub async fn drive(&mut self, mode: DriveMode) -> Step {
        let mut messages = Vec::new();
        let step = loop {
            match self.events.recv().await {
                Some(WorkflowEvent::Progress { message, resume }) => match mode {
                    DriveMode::UntilInteraction => {
                        messages.push(message);
                        let _ = resume.send(Reply::new());
                    }
                    DriveMode::EachMessage => {
                        self.pending = Some(Pending {
                            resume,
                            request: None,
                        });
                        break Step::Suspended {
                            point: SuspendPoint::Progress(message),
                            messages,
                        };
                    }
                },
                Some(WorkflowEvent::Interaction { request, resume }) => {
                    self.pending = Some(Pending {
                        resume,
                        request: Some(request.clone()),
                    });
                    break Step::Suspended {
                        point: SuspendPoint::Interaction(request),
                        messages,
                    };
                }
                None => {
                    // Every sender is gone: the body has returned (or panicked).
                    let outcome = match (&mut self.handle).await {
                        Ok(result) => result,
                        Err(e) if e.is_panic() => Err(WorkflowError::Failed(format!(
                            "workflow panicked: {}",
                            panic_message(e.into_panic())
                        ))),
                        Err(_) => Err(WorkflowError::Failed(
                            "workflow task was cancelled".to_string(),
                        )),
                    };
                    self.finished = true;
                    break Step::Completed { outcome, messages };
                }
            }
        };
        self.last_active = Instant::now();
        step
    }

    /// Inject `reply` at the pending suspension point and drive on.
    ///
    /// A reply that does not satisfy the pending interaction request is
    /// rejected and the session stays where it was.
    pub async fn resume(&mut self, reply: Reply, mode: DriveMode) -> Result<Step, EngineError> {
        let pending = match self.pending.take() {
            Some(pending) if !self.finished => pending,
            _ => {
                return Err(EngineError::UnknownTask(format!(
                    "task '{}' is not suspended; it has already finished",
                    self.task_id
                )))
            }
        };

        if let Some(request) = &pending.request {
            if let Err(msg) = request.check_reply(&reply) {
                self.pending = Some(pending);
                self.last_active = Instant::now();
                return Err(EngineError::Validation(format!(
                    "reply for task '{}' rejected: {}",
                    self.task_id, msg
                )));
            }
        }

        // A dropped receiver means the body is already gone; drive() then
        // observes the closed channel and collects its outcome.
        let _ = pending.resume.send(reply);
        Ok(self.drive(mode).await)
    }
}

impl Drop for ExecutionSession {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::FormField;
    use crate::workflow::Param;
    use serde_json::json;

    fn args(task_id: &str) -> WorkflowArgs {
        WorkflowArgs {
            task_id: task_id.to_string(),
            input: Some("hi".to_string()),
            model: None,
        }
    }

    async fn two_questions(
        args: WorkflowArgs,
        ctx: WorkflowContext,
    ) -> Result<Value, WorkflowError> {
        let counter = args.input().len();
        ctx.progress("start", "first").await?;
        let first = ctx
            .ask(InteractionRequest::new("q1", "?").field(FormField::text("a", "A")))
            .await?;
        ctx.progress("middle", "second").await?;
        let second = ctx
            .ask(InteractionRequest::new("q2", "?").field(FormField::text("b", "B")))
            .await?;
        Ok(json!({ "a": first["a"], "b": second["b"], "counter": counter }))
    }

    fn reply(key: &str, value: &str) -> Reply {
        let mut r = Reply::new();
        r.insert(key.to_string(), json!(value));
        r
    }

    #[tokio::test]
    async fn test_locals_survive_across_suspensions() {
        let descriptor = WorkflowDescriptor::from_fn("two", two_questions).param(Param::Input);
        let mut session = ExecutionSession::spawn(&descriptor, args("t-1"));

        let step = session.drive(DriveMode::UntilInteraction).await;
        match step {
            Step::Suspended {
                point: SuspendPoint::Interaction(req),
                messages,
            } => {
                assert_eq!(req.message.title, "q1");
                assert_eq!(messages, vec![Message::new("start", "first")]);
            }
            other => panic!("expected interaction, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::AwaitingInput);

        let step = session
            .resume(reply("a", "one"), DriveMode::UntilInteraction)
            .await
            .unwrap();
        assert!(matches!(
            step,
            Step::Suspended {
                point: SuspendPoint::Interaction(_),
                ..
            }
        ));

        let step = session
            .resume(reply("b", "two"), DriveMode::UntilInteraction)
            .await
            .unwrap();
        match step {
            Step::Completed { outcome, .. } => {
                assert_eq!(
                    outcome.unwrap(),
                    json!({ "a": "one", "b": "two", "counter": 2 })
                );
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert!(session.is_finished());

        let err = session
            .resume(Reply::new(), DriveMode::UntilInteraction)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_task");
    }

    #[tokio::test]
    async fn test_each_message_mode_stops_on_progress() {
        let descriptor = WorkflowDescriptor::from_fn("two", two_questions);
        let mut session = ExecutionSession::spawn(&descriptor, args("t-2"));

        let step = session.drive(DriveMode::EachMessage).await;
        assert!(matches!(
            step,
            Step::Suspended {
                point: SuspendPoint::Progress(_),
                ..
            }
        ));
        assert_eq!(session.state(), SessionState::AwaitingAck);

        // Progress acks need no fields.
        let step = session
            .resume(Reply::new(), DriveMode::EachMessage)
            .await
            .unwrap();
        assert!(matches!(
            step,
            Step::Suspended {
                point: SuspendPoint::Interaction(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_bad_reply_keeps_suspension_point() {
        let descriptor = WorkflowDescriptor::from_fn("two", two_questions);
        let mut session = ExecutionSession::spawn(&descriptor, args("t-3"));
        session.drive(DriveMode::UntilInteraction).await;

        let err = session
            .resume(Reply::new(), DriveMode::UntilInteraction)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(session.state(), SessionState::AwaitingInput);

        let step = session
            .resume(reply("a", "ok"), DriveMode::UntilInteraction)
            .await
            .unwrap();
        assert!(matches!(step, Step::Suspended { .. }));
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        async fn boom(_: WorkflowArgs, _: WorkflowContext) -> Result<Value, WorkflowError> {
            panic!("kaboom");
        }
        let descriptor = WorkflowDescriptor::from_fn("boom", boom);
        let mut session = ExecutionSession::spawn(&descriptor, args("t-4"));

        match session.drive(DriveMode::UntilInteraction).await {
            Step::Completed { outcome, .. } => {
                let err = outcome.unwrap_err();
                assert!(err.to_string().contains("kaboom"));
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }
}

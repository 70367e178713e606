//! Suspension handle passed to every workflow body.
//!
//! Each emission sends one event to the owning session and parks the body
//! on a oneshot until the controller resumes it, so at most one event is in
//! flight per task.

use tokio::sync::{mpsc, oneshot};

use super::WorkflowError;
use crate::envelope::{InteractionRequest, Message, Reply};

/// Event sent from a workflow body to its session.
#[derive(Debug)]
pub(crate) enum WorkflowEvent {
    Progress {
        message: Message,
        resume: oneshot::Sender<Reply>,
    },
    Interaction {
        request: InteractionRequest,
        resume: oneshot::Sender<Reply>,
    },
}

pub struct WorkflowContext {
    task_id: String,
    events: mpsc::Sender<WorkflowEvent>,
}

impl WorkflowContext {
    pub(crate) fn new(task_id: String, events: mpsc::Sender<WorkflowEvent>) -> Self {
        Self { task_id, events }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Emit a progress message. Returns once the controller lets the body
    /// continue (immediately, or on the next continue call in
    /// `each_message` mode).
    pub async fn progress(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let message = Message::new(title, body);
        self.emit(|resume| WorkflowEvent::Progress { message, resume })
            .await
            .map(|_| ())
    }

    /// Suspend until the caller answers `request`. The returned reply has
    /// already been checked against the request's fields.
    pub async fn ask(&self, request: InteractionRequest) -> Result<Reply, WorkflowError> {
        request.validate().map_err(WorkflowError::InvalidRequest)?;
        self.emit(|resume| WorkflowEvent::Interaction { request, resume })
            .await
    }

    async fn emit(
        &self,
        event: impl FnOnce(oneshot::Sender<Reply>) -> WorkflowEvent,
    ) -> Result<Reply, WorkflowError> {
        let (resume_tx, resume_rx) = oneshot::channel();
        self.events
            .send(event(resume_tx))
            .await
            .map_err(|_| WorkflowError::Detached)?;
        resume_rx.await.map_err(|_| WorkflowError::Detached)
    }
}

//! Session store: `task_id` → suspended [`ExecutionSession`].
//!
//! The map itself sits behind an async `RwLock`; each session has its own
//! `Mutex` so resumes of different tasks never block each other, while two
//! resumes of the same task are serialized (the loser is rejected with a
//! `Conflict` by the controller). The identifying fields are copied next to
//! the lock so diagnostics never wait on a session that is being driven.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::{ExecutionSession, SessionInfo, SessionState};
use crate::error::EngineError;

pub type SessionHandle = Arc<Mutex<ExecutionSession>>;

#[derive(Clone)]
struct Entry {
    workflow: String,
    created_at: DateTime<Utc>,
    session: SessionHandle,
}

impl Entry {
    fn info(&self, task_id: &str) -> SessionInfo {
        match self.session.try_lock() {
            Ok(session) => session.info(),
            Err(_) => SessionInfo {
                task_id: task_id.to_string(),
                workflow: self.workflow.clone(),
                created_at: self.created_at,
                idle_secs: 0,
                state: SessionState::Running,
            },
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its own task id. An existing entry is never
    /// overwritten.
    pub async fn create(&self, session: ExecutionSession) -> Result<SessionHandle, EngineError> {
        let task_id = session.task_id().to_string();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&task_id) {
            return Err(EngineError::Conflict(format!(
                "task '{}' already has a session",
                task_id
            )));
        }
        let entry = Entry {
            workflow: session.workflow().to_string(),
            created_at: session.created_at(),
            session: Arc::new(Mutex::new(session)),
        };
        let handle = Arc::clone(&entry.session);
        sessions.insert(task_id, entry);
        Ok(handle)
    }

    pub async fn get(&self, task_id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(task_id)
            .map(|entry| Arc::clone(&entry.session))
    }

    /// Remove a session; returns whether one was present. Dropping the last
    /// handle aborts the workflow task.
    pub async fn remove(&self, task_id: &str) -> bool {
        self.sessions.write().await.remove(task_id).is_some()
    }

    pub async fn contains(&self, task_id: &str) -> bool {
        self.sessions.read().await.contains_key(task_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of every stored session, oldest first. Sessions that are
    /// being driven right now are reported as `running`.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .map(|(task_id, entry)| entry.info(task_id))
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        infos
    }

    /// Evict every session idle for at least `ttl`. Sessions currently
    /// locked by a resume are left alone.
    pub async fn sweep_expired(&self, ttl: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let mut evicted = Vec::new();
        sessions.retain(|task_id, entry| {
            let expired = entry
                .session
                .try_lock()
                .map(|session| session.idle_for() >= ttl)
                .unwrap_or(false);
            if expired {
                evicted.push(task_id.clone());
            }
            !expired
        });
        drop(sessions);

        for task_id in &evicted {
            tracing::info!(task_id = %task_id, "Evicted idle session");
        }
        evicted
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval` until the
    /// returned handle is aborted.
    pub fn spawn_sweeper(&self, ttl: Duration, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = store.sweep_expired(ttl).await;
                if !evicted.is_empty() {
                    tracing::debug!(count = evicted.len(), "Session sweep finished");
                }
            }
        })
    }
}

//! Message envelope: the uniform response shape of every start/continue call.
//!
//! An envelope always carries `status`, `task_id` and `timestamp`, plus
//! exactly one body:
//!
//! | status           | body                                   |
//! |------------------|----------------------------------------|
//! | `in_progress`    | `message`                              |
//! | `awaiting_input` | `message` + `form_elements`            |
//! | `success`        | workflow payload merged at top level   |
//! | `error`          | `error` + `error_kind`                 |
//!
//! Progress messages emitted while a call drove the workflow are listed in
//! `messages` (omitted when empty).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;

/// Reply payload supplied by a continue call: field name → value.
pub type Reply = Map<String, Value>;

/// Success payload of a finished workflow.
pub type Payload = Map<String, Value>;

/// Keys owned by the envelope; a success payload cannot override them.
const RESERVED_KEYS: &[&str] = &["status", "task_id", "timestamp", "messages"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub title: String,
    pub body: String,
}

impl Message {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Select,
    Text,
}

/// One input the caller must (or may) provide in the next reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub required: bool,
}

impl FormField {
    pub fn select<I, S>(name: impl Into<String>, label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: FieldKind::Select,
            label: label.into(),
            options: options.into_iter().map(Into::into).collect(),
            required: true,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            label: label.into(),
            options: Vec::new(),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn check_value(&self, value: Option<&Value>) -> Result<(), String> {
        let text = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                return Err(format!(
                    "field '{}' must be a string, got {}",
                    self.name, other
                ))
            }
        };

        match text {
            None => {
                if self.required {
                    Err(format!("missing required field '{}'", self.name))
                } else {
                    Ok(())
                }
            }
            Some(s) if s.trim().is_empty() => {
                if self.required {
                    Err(format!("required field '{}' is blank", self.name))
                } else {
                    Ok(())
                }
            }
            Some(s) => match self.kind {
                FieldKind::Select if !self.options.iter().any(|o| o == s) => Err(format!(
                    "field '{}' must be one of {:?}, got '{}'",
                    self.name, self.options, s
                )),
                _ => Ok(()),
            },
        }
    }
}

/// A request for user input, emitted by a workflow at a suspension point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub message: Message,
    pub fields: Vec<FormField>,
}

impl InteractionRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message: Message::new(title, body),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    /// Check that every field is answerable from a single reply object.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err("interaction field with an empty name".to_string());
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("duplicate interaction field '{}'", field.name));
            }
            if field.kind == FieldKind::Select && field.options.is_empty() {
                return Err(format!("select field '{}' has no options", field.name));
            }
        }
        Ok(())
    }

    /// Check a reply against the declared fields.
    pub fn check_reply(&self, reply: &Reply) -> Result<(), String> {
        self.fields
            .iter()
            .try_for_each(|field| field.check_value(reply.get(&field.name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    InProgress,
    AwaitingInput,
    Success,
    Error,
}

impl EnvelopeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::AwaitingInput => "awaiting_input",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub enum EnvelopeKind {
    Progress(Message),
    Interaction(InteractionRequest),
    Success(Payload),
    Failure(EngineError),
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub task_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub kind: EnvelopeKind,
}

impl Envelope {
    fn build(task_id: Option<String>, kind: EnvelopeKind) -> Self {
        Self {
            task_id,
            timestamp: Utc::now(),
            messages: Vec::new(),
            kind,
        }
    }

    pub fn progress(task_id: impl Into<String>, message: Message) -> Self {
        Self::build(Some(task_id.into()), EnvelopeKind::Progress(message))
    }

    pub fn interaction(task_id: impl Into<String>, request: InteractionRequest) -> Self {
        Self::build(Some(task_id.into()), EnvelopeKind::Interaction(request))
    }

    pub fn success(task_id: Option<String>, payload: Payload) -> Self {
        Self::build(task_id, EnvelopeKind::Success(payload))
    }

    pub fn failure(task_id: Option<String>, error: EngineError) -> Self {
        Self::build(task_id, EnvelopeKind::Failure(error))
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn status(&self) -> EnvelopeStatus {
        match self.kind {
            EnvelopeKind::Progress(_) => EnvelopeStatus::InProgress,
            EnvelopeKind::Interaction(_) => EnvelopeStatus::AwaitingInput,
            EnvelopeKind::Success(_) => EnvelopeStatus::Success,
            EnvelopeKind::Failure(_) => EnvelopeStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EnvelopeKind::Success(_) | EnvelopeKind::Failure(_)
        )
    }

    pub fn error(&self) -> Option<&EngineError> {
        match &self.kind {
            EnvelopeKind::Failure(err) => Some(err),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();

        match &self.kind {
            EnvelopeKind::Progress(message) => {
                out.insert("message".into(), message_json(message));
            }
            EnvelopeKind::Interaction(request) => {
                out.insert("message".into(), message_json(&request.message));
                out.insert(
                    "form_elements".into(),
                    serde_json::to_value(&request.fields).unwrap_or_default(),
                );
            }
            EnvelopeKind::Success(payload) => {
                for (key, value) in payload {
                    if !RESERVED_KEYS.contains(&key.as_str()) {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
            EnvelopeKind::Failure(err) => {
                out.insert("error".into(), Value::String(err.to_string()));
                out.insert("error_kind".into(), Value::String(err.kind().into()));
            }
        }

        out.insert("status".into(), Value::String(self.status().as_str().into()));
        if let Some(task_id) = &self.task_id {
            out.insert("task_id".into(), Value::String(task_id.clone()));
        }
        out.insert(
            "timestamp".into(),
            Value::String(self.timestamp.to_rfc3339()),
        );
        if !self.messages.is_empty() {
            out.insert(
                "messages".into(),
                Value::Array(self.messages.iter().map(message_json).collect()),
            );
        }

        Value::Object(out)
    }
}

impl Serialize for Envelope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn message_json(message: &Message) -> Value {
    serde_json::json!({ "title": message.title, "body": message.body })
}

/// Normalize a workflow return value into a success payload.
///
/// Objects are used as-is, `null` becomes an empty payload, anything else
/// lands under `data`.
pub fn payload_from_value(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        Value::Null => Payload::new(),
        other => {
            let mut payload = Payload::new();
            payload.insert("data".into(), other);
            payload
        }
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Envelope {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = self
            .error()
            .and_then(|err| StatusCode::from_u16(err.status_code()).ok())
            .unwrap_or(StatusCode::OK);
        (status, axum::Json(self.to_json())).into_response()
    }
}

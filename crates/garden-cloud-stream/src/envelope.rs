use chrono::{DateTime, Utc};
use garden_events::{ActionState, LogLevel};
use serde::{Deserialize, Serialize};

use crate::ulid::Ulid;

/// Anything the ordered stream can buffer: it must carry a stable identifier
/// that acknowledgements refer back to.
pub trait Tracked: Clone + Send + Sync + 'static {
    fn ulid(&self) -> Ulid;
}

/// Kind of action whose status changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Build,
    Deploy,
    Run,
    Test,
}

/// Wire-ready payload variants. Domain events without a representation here
/// are never buffered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EnvelopePayload {
    CommandStarted {
        command_id: Ulid,
        name: String,
        args: Vec<String>,
        project_root: String,
        project_name: String,
        environment_name: String,
        namespace: Option<String>,
        parent_session_id: Option<Ulid>,
        client_version: String,
    },
    CommandCompleted {
        command_id: Ulid,
    },
    CommandFailed {
        command_id: Ulid,
        errors: Vec<String>,
    },
    CommandCancelled {
        command_id: Ulid,
    },
    ActionStatus {
        command_id: Ulid,
        kind: ActionKind,
        action_name: String,
        action_uid: String,
        state: ActionState,
        status: Option<String>,
    },
    Log {
        command_id: Ulid,
        level: LogLevel,
        message: String,
        section: Option<String>,
        action_name: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl EnvelopePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EnvelopePayload::CommandStarted { .. } => "command-started",
            EnvelopePayload::CommandCompleted { .. } => "command-completed",
            EnvelopePayload::CommandFailed { .. } => "command-failed",
            EnvelopePayload::CommandCancelled { .. } => "command-cancelled",
            EnvelopePayload::ActionStatus { .. } => "action-status",
            EnvelopePayload::Log { .. } => "log-entry",
        }
    }
}

/// A single outbound event.
///
/// The identifier is assigned once at conversion time and never changes; it
/// is both the send-buffer key and the acknowledgement correlation key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Ulid,
    pub session_id: Ulid,
    pub emitted_at: DateTime<Utc>,
    pub payload: EnvelopePayload,
}

impl Tracked for Envelope {
    fn ulid(&self) -> Ulid {
        self.id
    }
}

/// Severity of a message attached to an acknowledgement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    pub severity: AckSeverity,
    pub text: String,
}

/// Server-to-client confirmation for one envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub id: Ulid,
    pub success: bool,
    /// No further acknowledgement will arrive for `id`.
    pub is_final: bool,
    pub messages: Vec<AckMessage>,
}

impl Acknowledgement {
    pub fn success(id: Ulid) -> Self {
        Self {
            id,
            success: true,
            is_final: true,
            messages: vec![],
        }
    }

    pub fn failure(id: Ulid, is_final: bool) -> Self {
        Self {
            id,
            success: false,
            is_final,
            messages: vec![],
        }
    }

    pub fn with_message(mut self, severity: AckSeverity, text: impl Into<String>) -> Self {
        self.messages.push(AckMessage {
            severity,
            text: text.into(),
        });
        self
    }

    /// Whether this acknowledgement retires the envelope from the buffer.
    pub fn settles(&self) -> bool {
        self.success || self.is_final
    }
}

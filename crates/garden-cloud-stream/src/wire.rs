//! Mapping between envelopes/acknowledgements and the protobuf messages.

use garden_events::LogLevel;

use crate::envelope::{
    AckMessage, AckSeverity, Acknowledgement, ActionKind, Envelope, EnvelopePayload,
};
use crate::error::StreamError;
use crate::pb::v1::{self as pb, garden_event::EventData};

fn log_level(level: LogLevel) -> pb::LogLevel {
    match level {
        LogLevel::Error => pb::LogLevel::Error,
        LogLevel::Warn => pb::LogLevel::Warn,
        LogLevel::Info => pb::LogLevel::Info,
        LogLevel::Verbose => pb::LogLevel::Verbose,
        LogLevel::Debug => pb::LogLevel::Debug,
        LogLevel::Silly => pb::LogLevel::Silly,
    }
}

fn action_kind(kind: ActionKind) -> pb::ActionKind {
    match kind {
        ActionKind::Build => pb::ActionKind::Build,
        ActionKind::Deploy => pb::ActionKind::Deploy,
        ActionKind::Run => pb::ActionKind::Run,
        ActionKind::Test => pb::ActionKind::Test,
    }
}

fn event_data(payload: &EnvelopePayload) -> EventData {
    match payload {
        EnvelopePayload::CommandStarted {
            command_id,
            name,
            args,
            project_root,
            project_name,
            environment_name,
            namespace,
            parent_session_id,
            client_version,
        } => EventData::CommandExecutionStarted(pb::CommandExecutionStarted {
            command_ulid: command_id.to_string(),
            command_name: name.clone(),
            args: args.clone(),
            project_root: project_root.clone(),
            project_name: project_name.clone(),
            environment_name: environment_name.clone(),
            namespace: namespace.clone(),
            parent_session_ulid: parent_session_id.map(|id| id.to_string()),
            client_version: client_version.clone(),
        }),
        EnvelopePayload::CommandCompleted { command_id } => {
            EventData::CommandExecutionCompleted(pb::CommandExecutionCompleted {
                command_ulid: command_id.to_string(),
            })
        }
        EnvelopePayload::CommandFailed { command_id, errors } => {
            EventData::CommandExecutionFailed(pb::CommandExecutionFailed {
                command_ulid: command_id.to_string(),
                errors: errors.clone(),
            })
        }
        EnvelopePayload::CommandCancelled { command_id } => {
            EventData::CommandExecutionCancelled(pb::CommandExecutionCancelled {
                command_ulid: command_id.to_string(),
            })
        }
        EnvelopePayload::ActionStatus {
            command_id,
            kind,
            action_name,
            action_uid,
            state,
            status,
        } => EventData::ActionStatusChanged(pb::ActionStatusChanged {
            command_ulid: command_id.to_string(),
            kind: action_kind(*kind) as i32,
            action_name: action_name.clone(),
            action_uid: action_uid.clone(),
            state: state.as_str().to_string(),
            status: status.clone(),
        }),
        EnvelopePayload::Log {
            command_id,
            level,
            message,
            section,
            action_name,
            timestamp,
        } => EventData::LogEntry(pb::LogEntry {
            command_ulid: command_id.to_string(),
            level: log_level(*level) as i32,
            message: message.clone(),
            section: section.clone(),
            action_name: action_name.clone(),
            timestamp_unix_ms: timestamp.timestamp_millis(),
        }),
    }
}

impl From<&Envelope> for pb::IngestEventsRequest {
    fn from(envelope: &Envelope) -> Self {
        pb::IngestEventsRequest {
            event: Some(pb::GardenEvent {
                event_ulid: envelope.id.to_string(),
                session_ulid: envelope.session_id.to_string(),
                emitted_at_unix_ms: envelope.emitted_at.timestamp_millis(),
                event_data: Some(event_data(&envelope.payload)),
            }),
        }
    }
}

impl From<Envelope> for pb::IngestEventsRequest {
    fn from(envelope: Envelope) -> Self {
        pb::IngestEventsRequest::from(&envelope)
    }
}

fn severity(raw: i32) -> AckSeverity {
    match pb::Severity::try_from(raw) {
        Ok(pb::Severity::Error) => AckSeverity::Error,
        Ok(pb::Severity::Warning) => AckSeverity::Warning,
        Ok(pb::Severity::Info) => AckSeverity::Info,
        Ok(pb::Severity::Debug) | Ok(pb::Severity::Unspecified) | Err(_) => AckSeverity::Debug,
    }
}

impl TryFrom<pb::IngestEventsResponse> for Acknowledgement {
    type Error = StreamError;

    fn try_from(response: pb::IngestEventsResponse) -> Result<Self, Self::Error> {
        let id = response.event_ulid.parse().map_err(|e| {
            StreamError::MalformedAck(format!("event_ulid '{}': {}", response.event_ulid, e))
        })?;

        Ok(Acknowledgement {
            id,
            success: response.success,
            is_final: response.r#final,
            messages: response
                .messages
                .into_iter()
                .map(|m| AckMessage {
                    severity: severity(m.severity),
                    text: m.text,
                })
                .collect(),
        })
    }
}

impl From<&Acknowledgement> for pb::IngestEventsResponse {
    fn from(ack: &Acknowledgement) -> Self {
        pb::IngestEventsResponse {
            event_ulid: ack.id.to_string(),
            success: ack.success,
            r#final: ack.is_final,
            messages: ack
                .messages
                .iter()
                .map(|m| pb::ServerMessage {
                    severity: match m.severity {
                        AckSeverity::Debug => pb::Severity::Debug,
                        AckSeverity::Info => pb::Severity::Info,
                        AckSeverity::Warning => pb::Severity::Warning,
                        AckSeverity::Error => pb::Severity::Error,
                    } as i32,
                    text: m.text.clone(),
                })
                .collect(),
        }
    }
}

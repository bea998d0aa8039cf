use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventBusError;

/// Log severity, ordered from most to least severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Verbose,
    Debug,
    Silly,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl FromStr for LogLevel {
    type Err = EventBusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "verbose" => Ok(LogLevel::Verbose),
            "debug" => Ok(LogLevel::Debug),
            "silly" | "trace" => Ok(LogLevel::Silly),
            other => Err(EventBusError::Malformed(format!("unknown log level '{}'", other))),
        }
    }
}

/// Lifecycle state of an action as reported by the action router.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionState {
    GettingStatus,
    Cached,
    NotReady,
    Processing,
    Ready,
    Failed,
    Unknown,
}

impl ActionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionState::GettingStatus => "getting-status",
            ActionState::Cached => "cached",
            ActionState::NotReady => "not-ready",
            ActionState::Processing => "processing",
            ActionState::Ready => "ready",
            ActionState::Failed => "failed",
            ActionState::Unknown => "unknown",
        }
    }
}

/// Session identifiers carried by most event payloads.
///
/// Long-running commands (`dev`, `serve`) host several command sessions under
/// one process session; nested commands carry their host's id in
/// `_parentSessionId`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(
        rename = "_parentSessionId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_session_id: Option<String>,
}

impl EventContext {
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            parent_session_id: None,
        }
    }

    pub fn nested(session_id: impl Into<String>, parent_session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            parent_session_id: Some(parent_session_id.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfoPayload {
    #[serde(flatten)]
    pub context: EventContext,
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub project_root: String,
    pub project_name: String,
    pub environment_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusPayload {
    #[serde(flatten)]
    pub context: EventContext,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStatusPayload {
    #[serde(flatten)]
    pub context: EventContext,
    pub action_name: String,
    #[serde(default)]
    pub action_uid: String,
    pub state: ActionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryPayload {
    #[serde(flatten)]
    pub context: EventContext,
    pub level: LogLevel,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChangedPayload {
    pub path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyPayload {}

/// Names of every event the bus carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventName {
    CommandInfo,
    SessionCompleted,
    SessionFailed,
    SessionCancelled,
    BuildStatus,
    DeployStatus,
    RunStatus,
    TestStatus,
    LogEntry,
    ConfigChanged,
    WatchingForChanges,
    TaskGraphComplete,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventName::CommandInfo => "commandInfo",
            EventName::SessionCompleted => "sessionCompleted",
            EventName::SessionFailed => "sessionFailed",
            EventName::SessionCancelled => "sessionCancelled",
            EventName::BuildStatus => "buildStatus",
            EventName::DeployStatus => "deployStatus",
            EventName::RunStatus => "runStatus",
            EventName::TestStatus => "testStatus",
            EventName::LogEntry => "logEntry",
            EventName::ConfigChanged => "configChanged",
            EventName::WatchingForChanges => "watchingForChanges",
            EventName::TaskGraphComplete => "taskGraphComplete",
        };
        f.write_str(name)
    }
}

impl FromStr for EventName {
    type Err = EventBusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| EventBusError::UnknownEvent(s.to_string()))
    }
}

/// A Garden domain event as emitted on the event bus.
///
/// Serialized as `{"name": "<eventName>", "payload": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload", rename_all = "camelCase")]
pub enum GardenEvent {
    CommandInfo(CommandInfoPayload),
    SessionCompleted(SessionStatusPayload),
    SessionFailed(SessionStatusPayload),
    SessionCancelled(SessionStatusPayload),
    BuildStatus(ActionStatusPayload),
    DeployStatus(ActionStatusPayload),
    RunStatus(ActionStatusPayload),
    TestStatus(ActionStatusPayload),
    LogEntry(LogEntryPayload),
    ConfigChanged(ConfigChangedPayload),
    WatchingForChanges(EmptyPayload),
    TaskGraphComplete(EmptyPayload),
}

#[derive(Deserialize)]
struct RawEvent {
    name: String,
}

impl GardenEvent {
    /// Parse a single `{"name", "payload"}` JSON document.
    ///
    /// Unknown names are reported as [`EventBusError::UnknownEvent`] so callers
    /// can skip them without treating them as corrupt input.
    pub fn from_json(input: &str) -> Result<Self, EventBusError> {
        let raw: RawEvent = serde_json::from_str(input)?;
        raw.name.parse::<EventName>()?;
        Ok(serde_json::from_str(input)?)
    }

    /// A `sessionCancelled` event for the given session.
    pub fn session_cancelled(session_id: impl Into<String>) -> Self {
        GardenEvent::SessionCancelled(SessionStatusPayload {
            context: EventContext::session(session_id),
            errors: vec![],
        })
    }

    pub fn name(&self) -> EventName {
        match self {
            GardenEvent::CommandInfo(_) => EventName::CommandInfo,
            GardenEvent::SessionCompleted(_) => EventName::SessionCompleted,
            GardenEvent::SessionFailed(_) => EventName::SessionFailed,
            GardenEvent::SessionCancelled(_) => EventName::SessionCancelled,
            GardenEvent::BuildStatus(_) => EventName::BuildStatus,
            GardenEvent::DeployStatus(_) => EventName::DeployStatus,
            GardenEvent::RunStatus(_) => EventName::RunStatus,
            GardenEvent::TestStatus(_) => EventName::TestStatus,
            GardenEvent::LogEntry(_) => EventName::LogEntry,
            GardenEvent::ConfigChanged(_) => EventName::ConfigChanged,
            GardenEvent::WatchingForChanges(_) => EventName::WatchingForChanges,
            GardenEvent::TaskGraphComplete(_) => EventName::TaskGraphComplete,
        }
    }

    /// Session context of the event, if its payload carries one.
    pub fn context(&self) -> Option<&EventContext> {
        match self {
            GardenEvent::CommandInfo(p) => Some(&p.context),
            GardenEvent::SessionCompleted(p)
            | GardenEvent::SessionFailed(p)
            | GardenEvent::SessionCancelled(p) => Some(&p.context),
            GardenEvent::BuildStatus(p)
            | GardenEvent::DeployStatus(p)
            | GardenEvent::RunStatus(p)
            | GardenEvent::TestStatus(p) => Some(&p.context),
            GardenEvent::LogEntry(p) => Some(&p.context),
            GardenEvent::ConfigChanged(_)
            | GardenEvent::WatchingForChanges(_)
            | GardenEvent::TaskGraphComplete(_) => None,
        }
    }

    /// Level of a `logEntry` event; `None` for every other event.
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            GardenEvent::LogEntry(p) => Some(p.level),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_info_with_parent_session() {
        let json = r#"{
            "name": "commandInfo",
            "payload": {
                "sessionId": "c0ffee",
                "_parentSessionId": "dev-host",
                "name": "deploy",
                "args": ["api"],
                "projectRoot": "/src/demo",
                "projectName": "demo",
                "environmentName": "local"
            }
        }"#;

        let event = GardenEvent::from_json(json).unwrap();
        assert_eq!(event.name(), EventName::CommandInfo);
        let ctx = event.context().unwrap();
        assert_eq!(ctx.session_id.as_deref(), Some("c0ffee"));
        assert_eq!(ctx.parent_session_id.as_deref(), Some("dev-host"));
    }

    #[test]
    fn unknown_event_name_is_reported_separately() {
        let err = GardenEvent::from_json(r#"{"name": "somethingElse", "payload": {}}"#)
            .unwrap_err();
        assert!(matches!(err, EventBusError::UnknownEvent(name) if name == "somethingElse"));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let err = GardenEvent::from_json(r#"{"name": "deployStatus", "payload": {"state": 7}}"#)
            .unwrap_err();
        assert!(matches!(err, EventBusError::Malformed(_)));
    }

    #[test]
    fn log_levels_order_by_severity() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn event_name_display_matches_wire_name() {
        let event = GardenEvent::session_cancelled("s-1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], event.name().to_string());
        assert_eq!(json["payload"]["sessionId"], "s-1");
    }

    #[test]
    fn misc_events_have_no_context() {
        let event = GardenEvent::WatchingForChanges(EmptyPayload {});
        assert!(event.context().is_none());
        assert!(event.log_level().is_none());
    }
}

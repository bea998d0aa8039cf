//! Domain event to envelope conversion.

use chrono::Utc;
use garden_events::{ActionStatusPayload, EventContext, GardenEvent};
use indexmap::IndexMap;
use tracing::trace;

use crate::envelope::{ActionKind, Envelope, EnvelopePayload};
use crate::ulid::{Ulid, UlidGenerator};

/// Turns a domain event into zero or more wire items.
///
/// Implementations must not fail on events they have no representation for;
/// those convert to an empty vector.
pub trait EventConverter<T>: Send + 'static {
    fn convert(&mut self, event: &GardenEvent) -> Vec<T>;
}

/// Memoized mapping from application session ids to wire ids.
///
/// Unbounded unless a capacity is given, in which case the least recently
/// used mapping is dropped first.
pub struct SessionIdMap {
    ids: IndexMap<String, Ulid>,
    capacity: Option<usize>,
}

impl SessionIdMap {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            ids: IndexMap::new(),
            capacity: capacity.map(|c| c.max(1)),
        }
    }

    pub fn resolve(&mut self, session_id: &str, generator: &UlidGenerator) -> Ulid {
        if let Some(index) = self.ids.get_index_of(session_id) {
            let last = self.ids.len() - 1;
            if self.capacity.is_some() && index != last {
                self.ids.move_index(index, last);
                return self.ids[last];
            }
            return self.ids[index];
        }

        if let Some(cap) = self.capacity {
            while self.ids.len() >= cap {
                if let Some((evicted, _)) = self.ids.shift_remove_index(0) {
                    trace!(session_id = %evicted, "Evicted session id mapping");
                }
            }
        }

        let id = generator.next();
        self.ids.insert(session_id.to_string(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Converter for the `garden.public.events.v1` protocol.
pub struct GrpcEventConverter {
    process_session_id: String,
    client_version: String,
    ids: UlidGenerator,
    sessions: SessionIdMap,
}

impl GrpcEventConverter {
    pub fn new(process_session_id: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            process_session_id: process_session_id.into(),
            client_version: client_version.into(),
            ids: UlidGenerator::new(),
            sessions: SessionIdMap::new(None),
        }
    }

    pub fn with_session_capacity(mut self, capacity: Option<usize>) -> Self {
        self.sessions = SessionIdMap::new(capacity);
        self
    }

    pub fn process_session_id(&self) -> &str {
        &self.process_session_id
    }

    /// Wire id for an application session id.
    pub fn session_ulid(&mut self, session_id: &str) -> Ulid {
        self.sessions.resolve(session_id, &self.ids)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The session an envelope is filed under: an explicit parent first, then
    /// the event's own session, then the process session.
    fn owning_session(&mut self, context: &EventContext) -> Ulid {
        let key = context
            .parent_session_id
            .as_deref()
            .or(context.session_id.as_deref())
            .unwrap_or(&self.process_session_id)
            .to_string();
        self.session_ulid(&key)
    }

    /// The command the event belongs to: its own session, else the process.
    fn command_id(&mut self, context: &EventContext) -> Ulid {
        let key = context
            .session_id
            .as_deref()
            .unwrap_or(&self.process_session_id)
            .to_string();
        self.session_ulid(&key)
    }

    fn action_status(
        &mut self,
        kind: ActionKind,
        payload: &ActionStatusPayload,
    ) -> EnvelopePayload {
        EnvelopePayload::ActionStatus {
            command_id: self.command_id(&payload.context),
            kind,
            action_name: payload.action_name.clone(),
            action_uid: payload.action_uid.clone(),
            state: payload.state,
            status: payload.status.clone(),
        }
    }

    fn payload(&mut self, event: &GardenEvent) -> Option<EnvelopePayload> {
        let payload = match event {
            GardenEvent::CommandInfo(info) => {
                let parent_session_id = info
                    .context
                    .parent_session_id
                    .as_deref()
                    .map(|parent| self.session_ulid(parent));
                EnvelopePayload::CommandStarted {
                    command_id: self.command_id(&info.context),
                    name: info.name.clone(),
                    args: info.args.clone(),
                    project_root: info.project_root.clone(),
                    project_name: info.project_name.clone(),
                    environment_name: info.environment_name.clone(),
                    namespace: info.namespace.clone(),
                    parent_session_id,
                    client_version: self.client_version.clone(),
                }
            }
            GardenEvent::SessionCompleted(status) => EnvelopePayload::CommandCompleted {
                command_id: self.command_id(&status.context),
            },
            GardenEvent::SessionFailed(status) => EnvelopePayload::CommandFailed {
                command_id: self.command_id(&status.context),
                errors: status.errors.clone(),
            },
            GardenEvent::SessionCancelled(status) => EnvelopePayload::CommandCancelled {
                command_id: self.command_id(&status.context),
            },
            GardenEvent::BuildStatus(p) => self.action_status(ActionKind::Build, p),
            GardenEvent::DeployStatus(p) => self.action_status(ActionKind::Deploy, p),
            GardenEvent::RunStatus(p) => self.action_status(ActionKind::Run, p),
            GardenEvent::TestStatus(p) => self.action_status(ActionKind::Test, p),
            GardenEvent::LogEntry(entry) => {
                if entry.message.is_empty() {
                    return None;
                }
                EnvelopePayload::Log {
                    command_id: self.command_id(&entry.context),
                    level: entry.level,
                    message: entry.message.clone(),
                    section: entry.section.clone(),
                    action_name: entry.action_name.clone(),
                    timestamp: entry.timestamp,
                }
            }
            GardenEvent::ConfigChanged(_)
            | GardenEvent::WatchingForChanges(_)
            | GardenEvent::TaskGraphComplete(_) => return None,
        };
        Some(payload)
    }
}

impl EventConverter<Envelope> for GrpcEventConverter {
    fn convert(&mut self, event: &GardenEvent) -> Vec<Envelope> {
        let Some(payload) = self.payload(event) else {
            trace!(event = %event.name(), "No wire representation, dropping");
            return vec![];
        };

        let session_id = match event.context() {
            Some(context) => self.owning_session(context),
            None => {
                let process = self.process_session_id.clone();
                self.session_ulid(&process)
            }
        };

        vec![Envelope {
            id: self.ids.next(),
            session_id,
            emitted_at: Utc::now(),
            payload,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garden_events::{
        ActionState, CommandInfoPayload, ConfigChangedPayload, EmptyPayload, LogEntryPayload,
        LogLevel, SessionStatusPayload,
    };

    fn converter() -> GrpcEventConverter {
        GrpcEventConverter::new("process-session", "0.13.0")
    }

    fn completed(context: EventContext) -> GardenEvent {
        GardenEvent::SessionCompleted(SessionStatusPayload {
            context,
            errors: vec![],
        })
    }

    fn log(message: &str) -> GardenEvent {
        GardenEvent::LogEntry(LogEntryPayload {
            context: EventContext::session("s1"),
            level: LogLevel::Info,
            message: message.to_string(),
            section: None,
            action_name: None,
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn same_session_maps_to_same_wire_id() {
        let mut converter = converter();
        let first = converter.convert(&completed(EventContext::session("s1")));
        let second = converter.convert(&log("hello"));

        assert_eq!(first[0].session_id, second[0].session_id);
        assert_ne!(first[0].id, second[0].id);
        assert!(second[0].id > first[0].id);
    }

    #[test]
    fn parent_session_takes_precedence() {
        let mut converter = converter();
        let parent = converter.session_ulid("dev-session");
        let child = converter.session_ulid("build-session");

        let envelopes = converter.convert(&completed(EventContext::nested(
            "build-session",
            "dev-session",
        )));

        assert_eq!(envelopes[0].session_id, parent);
        assert_eq!(
            envelopes[0].payload,
            EnvelopePayload::CommandCompleted { command_id: child }
        );
    }

    #[test]
    fn missing_context_falls_back_to_process_session() {
        let mut converter = converter();
        let process = converter.session_ulid("process-session");
        let envelopes = converter.convert(&completed(EventContext::default()));
        assert_eq!(envelopes[0].session_id, process);
    }

    #[test]
    fn command_info_carries_parent_and_version() {
        let mut converter = converter();
        let envelopes = converter.convert(&GardenEvent::CommandInfo(CommandInfoPayload {
            context: EventContext::nested("child", "parent"),
            name: "deploy".into(),
            args: vec!["--force".into()],
            project_root: "/work".into(),
            project_name: "demo".into(),
            environment_name: "local".into(),
            namespace: None,
        }));

        let parent = converter.session_ulid("parent");
        match &envelopes[0].payload {
            EnvelopePayload::CommandStarted {
                parent_session_id,
                client_version,
                ..
            } => {
                assert_eq!(*parent_session_id, Some(parent));
                assert_eq!(client_version, "0.13.0");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn action_kind_follows_event_name() {
        let mut converter = converter();
        let envelopes = converter.convert(&GardenEvent::TestStatus(ActionStatusPayload {
            context: EventContext::session("s1"),
            action_name: "unit".into(),
            action_uid: "uid-1".into(),
            state: ActionState::Processing,
            status: None,
        }));
        assert!(matches!(
            envelopes[0].payload,
            EnvelopePayload::ActionStatus {
                kind: ActionKind::Test,
                state: ActionState::Processing,
                ..
            }
        ));
    }

    #[test]
    fn events_without_wire_form_are_dropped() {
        let mut converter = converter();
        assert!(converter.convert(&log("")).is_empty());
        assert!(converter
            .convert(&GardenEvent::ConfigChanged(ConfigChangedPayload {
                path: "garden.yml".into()
            }))
            .is_empty());
        assert!(converter
            .convert(&GardenEvent::WatchingForChanges(EmptyPayload {}))
            .is_empty());
    }

    #[test]
    fn bounded_map_evicts_least_recently_used() {
        let ids = UlidGenerator::new();
        let mut map = SessionIdMap::new(Some(2));
        let a = map.resolve("a", &ids);
        map.resolve("b", &ids);
        assert_eq!(map.resolve("a", &ids), a);

        map.resolve("c", &ids);
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("a", &ids), a);
        // "b" was least recently used and got a fresh id.
        let b_again = map.resolve("b", &ids);
        assert!(b_again > a);
    }
}

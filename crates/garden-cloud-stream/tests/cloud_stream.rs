//! Garden events flowing from the bus through conversion into the stream.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{wait_until, ScriptedClient};
use garden_cloud_stream::{
    Acknowledgement, CloudEventStream, Envelope, EnvelopePayload, StreamConfig,
};
use garden_events::{
    CleanupHooks, CommandInfoPayload, ConfigChangedPayload, EventBus, EventContext, GardenEvent,
    LogEntryPayload, LogLevel, SessionStatusPayload,
};
use tokio::time::Instant;

const PROCESS_SESSION: &str = "process-session";

fn command_info(session: &str) -> GardenEvent {
    GardenEvent::CommandInfo(CommandInfoPayload {
        context: EventContext::session(session),
        name: "deploy".into(),
        args: vec![],
        project_root: "/work/demo".into(),
        project_name: "demo".into(),
        environment_name: "local".into(),
        namespace: Some("demo-local".into()),
    })
}

fn session_completed(session: &str) -> GardenEvent {
    GardenEvent::SessionCompleted(SessionStatusPayload {
        context: EventContext::session(session),
        errors: vec![],
    })
}

fn log(level: LogLevel, message: &str) -> GardenEvent {
    GardenEvent::LogEntry(LogEntryPayload {
        context: EventContext::session("s1"),
        level,
        message: message.into(),
        section: None,
        action_name: None,
        timestamp: Utc::now(),
    })
}

fn start(
    client: ScriptedClient<Envelope>,
) -> (Arc<CloudEventStream>, Arc<EventBus>, Arc<CleanupHooks>) {
    let bus = Arc::new(EventBus::new());
    let hooks = Arc::new(CleanupHooks::new());
    let stream = CloudEventStream::start(
        client,
        bus.clone(),
        hooks.clone(),
        PROCESS_SESSION,
        "0.13.0",
        StreamConfig::default(),
    );
    (stream, bus, hooks)
}

#[tokio::test(start_paused = true)]
async fn never_connected_close_times_out_with_events_buffered() {
    let (client, _harness) = ScriptedClient::offline();
    let (stream, bus, _hooks) = start(client);

    bus.emit(command_info("s1"));
    bus.emit(session_completed("s1"));
    wait_until(|| stream.buffered_len() == 2).await;

    let started = Instant::now();
    stream.close().await;
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(stream.buffered_len(), 2);
    assert_eq!(bus.subscription_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn events_of_one_session_share_a_wire_session() {
    let (client, mut harness) = ScriptedClient::new(vec![]);
    let (stream, bus, _hooks) = start(client);

    bus.emit(command_info("s1"));
    bus.emit(session_completed("s1"));

    let mut conn = harness.next_connection().await;
    let envelopes = conn.take(2).await;
    assert_eq!(envelopes[0].session_id, envelopes[1].session_id);
    assert!(envelopes[0].id < envelopes[1].id);
    assert!(matches!(envelopes[0].payload, EnvelopePayload::CommandStarted { .. }));
    assert!(matches!(envelopes[1].payload, EnvelopePayload::CommandCompleted { .. }));

    for envelope in &envelopes {
        conn.ack(Acknowledgement::success(envelope.id));
    }
    stream.close().await;
    assert_eq!(stream.buffered_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn events_without_wire_form_are_never_buffered() {
    let (client, _harness) = ScriptedClient::offline();
    let (stream, bus, _hooks) = start(client);

    bus.emit(GardenEvent::ConfigChanged(ConfigChangedPayload {
        path: "project.garden.yml".into(),
    }));
    bus.emit(log(LogLevel::Info, ""));
    bus.emit(log(LogLevel::Debug, "below the forwarded level"));
    bus.emit(session_completed("s1"));

    wait_until(|| stream.buffered_len() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(stream.buffered_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn interrupt_hook_reports_cancellation_last() {
    let (client, mut harness) = ScriptedClient::new(vec![]);
    let (stream, bus, hooks) = start(client);
    assert_eq!(hooks.len(), 1);

    let mut conn = harness.next_connection().await;
    bus.emit(command_info(PROCESS_SESSION));
    let started = conn.next_item().await;
    conn.ack(Acknowledgement::success(started.id));

    let ran = tokio::spawn({
        let hooks = hooks.clone();
        async move { hooks.run_all().await }
    });

    let cancelled = conn.next_item().await;
    match cancelled.payload {
        EnvelopePayload::CommandCancelled { command_id } => {
            assert_eq!(cancelled.session_id, started.session_id);
            assert_eq!(command_id, cancelled.session_id);
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
    conn.ack(Acknowledgement::success(cancelled.id));

    ran.await.unwrap();
    assert!(stream.is_closed());
    assert!(hooks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn close_unregisters_the_interrupt_hook() {
    let (client, _harness) = ScriptedClient::offline();
    let (stream, _bus, hooks) = start(client);

    stream.close().await;
    stream.close().await;
    assert!(hooks.is_empty());
    stream.wait().await.unwrap();
}

//! Pipe JSON-lines Garden events into a cloud event stream.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use garden_cloud_stream::{CloudEventStream, GrpcIngestionClient};
use garden_events::{CleanupHooks, EventBus, EventBusError, GardenEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;

/// What a relay run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaySummary {
    /// Lines parsed and emitted on the bus
    pub emitted: usize,
    /// Unknown or malformed lines
    pub skipped: usize,
    /// Events still unacknowledged at exit
    pub unacknowledged: usize,
    pub interrupted: bool,
}

/// Read one event per line from `input` until EOF or `interrupt`, then close
/// the stream.
///
/// On interrupt the process session is reported as cancelled before closing.
/// Returns an error when the stream stopped on an unrecoverable error under
/// the escalate policy.
pub async fn run<R, F>(
    input: R,
    config: RelayConfig,
    session_id: String,
    interrupt: F,
) -> anyhow::Result<RelaySummary>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut client = GrpcIngestionClient::new(config.cloud.endpoint.clone())
        .with_connect_timeout(config.cloud.connect_timeout());
    if let Some(token) = &config.cloud.auth_token {
        client = client.with_auth_token(token.clone());
    }

    let bus = Arc::new(EventBus::new());
    let hooks = Arc::new(CleanupHooks::new());
    info!(
        endpoint = %config.cloud.endpoint,
        session_id = %session_id,
        "Streaming events to Garden Cloud"
    );
    let stream = CloudEventStream::start(
        client,
        bus.clone(),
        hooks.clone(),
        session_id,
        env!("CARGO_PKG_VERSION"),
        config.stream,
    );

    let mut summary = RelaySummary::default();
    let mut lines = input.lines();
    let finished = stream.wait();
    tokio::pin!(finished);
    tokio::pin!(interrupt);
    let mut outcome = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read events from input")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match GardenEvent::from_json(line) {
                    Ok(event) => {
                        bus.emit(event);
                        summary.emitted += 1;
                    }
                    Err(EventBusError::UnknownEvent(name)) => {
                        debug!(event = %name, "Skipping unknown event");
                        summary.skipped += 1;
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed event line");
                        summary.skipped += 1;
                    }
                }
            }
            _ = &mut interrupt => {
                summary.interrupted = true;
                break;
            }
            result = &mut finished, if outcome.is_none() => {
                // After a bail-out events are still buffered; only an
                // escalated error stops the relay.
                let failed = result.is_err();
                outcome = Some(result);
                if failed {
                    break;
                }
            }
        }
    }

    if summary.interrupted {
        hooks.run_all().await;
    } else {
        stream.close().await;
    }

    let outcome = match outcome {
        Some(outcome) => outcome,
        None => finished.await,
    };
    summary.unacknowledged = stream.buffered_len();
    outcome.context("event stream stopped")?;

    info!(
        emitted = summary.emitted,
        skipped = summary.skipped,
        unacknowledged = summary.unacknowledged,
        "Relay finished"
    );
    Ok(summary)
}

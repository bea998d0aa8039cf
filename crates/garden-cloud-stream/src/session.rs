//! One connection attempt: open, flush, consume acknowledgements.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, trace, warn};

use crate::client::{AckStream, IngestionClient};
use crate::envelope::{AckSeverity, Acknowledgement, Tracked};
use crate::error::StreamError;
use crate::ordered::Shared;

/// How a connection attempt ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// The remote closed its side of the stream.
    RemoteClosed,
    /// A close was pending and every buffered item has been acknowledged.
    Drained,
    /// The stream was closed locally.
    Closed,
}

pub(crate) async fn run_session<T, C>(
    shared: &Shared<T>,
    client: &C,
) -> Result<SessionEnd, StreamError>
where
    T: Tracked,
    C: IngestionClient<T> + ?Sized,
{
    let (outbound, rx) = mpsc::unbounded_channel();

    debug!("Opening ingestion stream");
    let acks = tokio::select! {
        opened = client.open(UnboundedReceiverStream::new(rx)) => match opened {
            Ok(acks) => acks,
            Err(e) => {
                debug!(error = %e, "Failed to open ingestion stream");
                return Err(e);
            }
        },
        _ = shared.closed() => return Ok(SessionEnd::Closed),
    };

    // Replay and install the sender under one lock so that nothing appended
    // meanwhile can be written ahead of older buffered items.
    {
        let mut state = shared.lock();
        for item in state.buffer.iter() {
            let _ = outbound.send(item.clone());
        }
        debug!(flushed = state.buffer.len(), "Flushed buffered events");
        state.outbound = Some(outbound);
    }

    let result = consume_acks(shared, acks).await;

    shared.lock().outbound = None;
    debug!("Ingestion stream disconnected");
    result
}

async fn consume_acks<T: Tracked>(
    shared: &Shared<T>,
    mut acks: AckStream,
) -> Result<SessionEnd, StreamError> {
    loop {
        let next = tokio::select! {
            next = acks.next() => next,
            _ = shared.closed() => return Ok(SessionEnd::Closed),
        };

        match next {
            None => return Ok(SessionEnd::RemoteClosed),
            Some(ack) => {
                if handle_ack(shared, ack?)? {
                    return Ok(SessionEnd::Drained);
                }
            }
        }
    }
}

/// Apply one acknowledgement. Returns true once a pending close has been
/// satisfied.
fn handle_ack<T: Tracked>(shared: &Shared<T>, ack: Acknowledgement) -> Result<bool, StreamError> {
    trace!(
        event_id = %ack.id,
        success = ack.success,
        is_final = ack.is_final,
        "Received acknowledgement"
    );
    if !ack.success {
        debug!(event_id = %ack.id, is_final = ack.is_final, "Event not acknowledged as successful");
    }

    let mut state = shared.lock();
    if ack.settles() {
        state.buffer.remove(&ack.id);
    }

    let mut reported = None;
    for message in &ack.messages {
        match message.severity {
            AckSeverity::Debug => debug!(event_id = %ack.id, "{}", message.text),
            AckSeverity::Info => info!(event_id = %ack.id, "{}", message.text),
            AckSeverity::Warning => warn!(event_id = %ack.id, "{}", message.text),
            AckSeverity::Error => {
                error!(event_id = %ack.id, "{}", message.text);
                reported.get_or_insert_with(|| message.text.clone());
            }
        }
    }

    // A pending close is released even when the same ack reports an error.
    let drained = !state.close_waiters.is_empty() && state.buffer.is_empty();
    if drained {
        for waiter in state.close_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    match reported {
        Some(text) => Err(StreamError::ServerReported(text)),
        None => Ok(drained),
    }
}

//! Reconnect loop.

use std::sync::Arc;

use tracing::{debug, error};

use crate::client::IngestionClient;
use crate::config::FatalErrorPolicy;
use crate::envelope::Tracked;
use crate::error::StreamError;
use crate::ordered::Shared;
use crate::session::{run_session, SessionEnd};

/// Keep a session running until the stream is closed.
///
/// Recoverable errors and remote disconnects back off for the configured
/// interval and retry. Anything else ends the loop according to the
/// configured fatal-error policy.
pub(crate) async fn run<T, C>(shared: Arc<Shared<T>>, client: Arc<C>) -> Result<(), StreamError>
where
    T: Tracked,
    C: IngestionClient<T>,
{
    let _running = shared.running_guard();

    while !shared.is_closed() {
        match run_session(&shared, client.as_ref()).await {
            Ok(SessionEnd::Closed) => break,
            Ok(end) => debug!(?end, "Ingestion stream ended"),
            Err(e) if e.is_recoverable() => {
                debug!(
                    error = %e,
                    backoff_ms = shared.config.reconnect_backoff_ms,
                    "Ingestion stream failed, reconnecting"
                );
            }
            Err(e) => match shared.config.fatal_errors {
                FatalErrorPolicy::BailOut => {
                    debug!(error = %e, "Unexpected error while streaming events, bailing out");
                    return Ok(());
                }
                FatalErrorPolicy::Escalate => {
                    error!(error = %e, "Unrecoverable error while streaming events");
                    return Err(e);
                }
            },
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.config.reconnect_backoff()) => {}
            _ = shared.closed() => break,
        }
    }

    debug!("Event stream loop stopped");
    Ok(())
}

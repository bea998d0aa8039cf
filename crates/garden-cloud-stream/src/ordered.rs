//! Generic ordered, acknowledgement-tracked stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::buffer::SendBuffer;
use crate::client::IngestionClient;
use crate::config::StreamConfig;
use crate::envelope::Tracked;
use crate::error::StreamError;
use crate::lifecycle;
use crate::ulid::Ulid;

/// State touched by appends, the flush step and the ack loop. Every mutation
/// happens under one lock so a flush can never interleave with an append.
pub(crate) struct StreamState<T> {
    pub(crate) buffer: SendBuffer<T>,
    pub(crate) outbound: Option<mpsc::UnboundedSender<T>>,
    pub(crate) close_waiters: Vec<oneshot::Sender<()>>,
}

pub(crate) struct Shared<T> {
    state: Mutex<StreamState<T>>,
    closed: watch::Sender<bool>,
    running: watch::Sender<bool>,
    pub(crate) config: StreamConfig,
}

impl<T: Tracked> Shared<T> {
    fn new(config: StreamConfig) -> Self {
        let buffer = match config.max_buffered_events {
            Some(cap) => SendBuffer::bounded(cap),
            None => SendBuffer::new(),
        };
        let (closed, _) = watch::channel(false);
        let (running, _) = watch::channel(true);
        Self {
            state: Mutex::new(StreamState {
                buffer,
                outbound: None,
                close_waiters: Vec::new(),
            }),
            closed,
            running,
            config,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StreamState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the stream has been closed.
    pub(crate) async fn closed(&self) {
        wait_for(&self.closed, true).await
    }

    pub(crate) fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Resolves once the reconnect loop has exited.
    async fn stopped(&self) {
        wait_for(&self.running, false).await
    }

    /// Marks the reconnect loop as running until the guard is dropped, which
    /// also covers the loop task panicking or being aborted.
    pub(crate) fn running_guard(&self) -> RunningGuard<'_> {
        RunningGuard(&self.running)
    }
}

pub(crate) struct RunningGuard<'a>(&'a watch::Sender<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

async fn wait_for(flag: &watch::Sender<bool>, value: bool) {
    let mut rx = flag.subscribe();
    while *rx.borrow_and_update() != value {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Buffers items until the remote acknowledges them, and keeps a connection
/// alive in the background to deliver them.
///
/// Items are written in append order on every connection; a reconnect replays
/// the whole unacknowledged set before anything appended later.
pub struct OrderedAckStream<T: Tracked> {
    shared: Arc<Shared<T>>,
    closing: AtomicBool,
    task: Mutex<Option<JoinHandle<Result<(), StreamError>>>>,
}

impl<T: Tracked> OrderedAckStream<T> {
    /// Start the reconnect loop on the current tokio runtime.
    pub fn spawn<C>(client: C, config: StreamConfig) -> Self
    where
        C: IngestionClient<T>,
    {
        let shared = Arc::new(Shared::new(config));
        let task = tokio::spawn(lifecycle::run(shared.clone(), Arc::new(client)));

        Self {
            shared,
            closing: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
        }
    }

    /// Buffer an item and, if a connection is open, write it without waiting.
    pub fn append(&self, item: T) -> Result<(), StreamError> {
        if self.shared.is_closed() {
            return Err(StreamError::Closed);
        }

        let id = item.ulid();
        let mut state = self.shared.lock();
        if let Some(outbound) = &state.outbound {
            // A failed write is retried from the buffer on the next connection.
            let _ = outbound.send(item.clone());
        }
        if let Some(evicted) = state.buffer.append(item) {
            warn!(
                event_id = %evicted.ulid(),
                max_buffered = ?self.shared.config.max_buffered_events,
                "Send buffer full, dropping oldest unacknowledged event"
            );
        }
        trace!(event_id = %id, buffered = state.buffer.len(), "Event buffered");
        Ok(())
    }

    pub fn buffered_len(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    /// Ids of unacknowledged items, oldest first.
    pub fn buffered_ids(&self) -> Vec<Ulid> {
        self.shared.lock().buffer.ids()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().outbound.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Wait (bounded by the drain timeout) for every buffered item to be
    /// acknowledged, then stop the stream. Only the first call does anything.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, rx) = oneshot::channel();
        let pending = {
            let mut state = self.shared.lock();
            if state.buffer.is_empty() {
                None
            } else {
                state.close_waiters.push(tx);
                Some(state.buffer.len())
            }
        };

        if let Some(buffered) = pending {
            if !self.shared.is_running() {
                warn!(
                    buffered,
                    "Event stream is no longer running, Garden Cloud may show incomplete information"
                );
            } else {
                debug!(buffered, "Waiting for outstanding acknowledgements");
                let timeout = self.shared.config.drain_timeout();
                let drained = async {
                    tokio::select! {
                        _ = rx => true,
                        _ = self.shared.stopped() => false,
                    }
                };
                match tokio::time::timeout(timeout, drained).await {
                    Ok(true) => debug!("All events acknowledged"),
                    Ok(false) => warn!(
                        buffered = self.buffered_len(),
                        "Event stream stopped while draining, Garden Cloud may show incomplete information"
                    ),
                    Err(_) => warn!(
                        buffered = self.buffered_len(),
                        ?timeout,
                        "Timed out waiting for event acknowledgements, Garden Cloud may show incomplete information"
                    ),
                }
            }
        }

        {
            let mut state = self.shared.lock();
            state.outbound = None;
            state.close_waiters.clear();
        }
        self.shared.closed.send_replace(true);
        debug!("Event stream closed");
    }

    /// Wait for the background loop to stop and return its outcome.
    ///
    /// `Ok` after a close or a bail-out; the error itself when the loop ended
    /// on an unrecoverable error under the escalate policy.
    pub async fn wait(&self) -> Result<(), StreamError> {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match task {
            Some(task) => task
                .await
                .map_err(|e| StreamError::Unexpected(format!("stream task failed: {}", e)))?,
            None => Ok(()),
        }
    }
}

impl<T: Tracked> Drop for OrderedAckStream<T> {
    fn drop(&mut self) {
        self.shared.closed.send_replace(true);
    }
}

//! Garden Cloud event stream: bus subscription, conversion and delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use garden_events::{
    CleanupHooks, EventBus, GardenEvent, HookId, SubscriptionFilter, SubscriptionId,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::IngestionClient;
use crate::config::StreamConfig;
use crate::converter::{EventConverter, GrpcEventConverter};
use crate::envelope::Envelope;
use crate::error::StreamError;
use crate::ordered::OrderedAckStream;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Streams the events of one Garden process to the cloud.
pub struct CloudEventStream {
    inner: Arc<OrderedAckStream<Envelope>>,
    converter: Arc<Mutex<GrpcEventConverter>>,
    bus: Arc<EventBus>,
    hooks: Arc<CleanupHooks>,
    subscriptions: Vec<SubscriptionId>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    hook: Mutex<Option<HookId>>,
    closing: AtomicBool,
}

impl CloudEventStream {
    /// Subscribe to `bus` and start delivering through `client`.
    ///
    /// Also registers a cleanup hook that reports the process session as
    /// cancelled and closes the stream when the process is interrupted.
    pub fn start<C>(
        client: C,
        bus: Arc<EventBus>,
        hooks: Arc<CleanupHooks>,
        process_session_id: impl Into<String>,
        client_version: impl Into<String>,
        config: StreamConfig,
    ) -> Arc<Self>
    where
        C: IngestionClient<Envelope>,
    {
        let converter = GrpcEventConverter::new(process_session_id, client_version)
            .with_session_capacity(config.session_cache_capacity);
        let converter = Arc::new(Mutex::new(converter));
        let log_level = config.log_level;
        let inner = Arc::new(OrderedAckStream::spawn(client, config));

        let (tx, rx) = mpsc::unbounded_channel();
        let subscriptions = vec![
            bus.subscribe_into(SubscriptionFilter::Events, tx.clone()),
            bus.subscribe_into(SubscriptionFilter::Logs { max_level: log_level }, tx),
        ];
        let forwarder = tokio::spawn(forward(rx, converter.clone(), inner.clone()));

        let stream = Arc::new(Self {
            inner,
            converter,
            bus,
            hooks,
            subscriptions,
            forwarder: Mutex::new(Some(forwarder)),
            hook: Mutex::new(None),
            closing: AtomicBool::new(false),
        });

        let weak: Weak<Self> = Arc::downgrade(&stream);
        let hook = stream.hooks.register("cloud-event-stream", move || {
            async move {
                if let Some(stream) = weak.upgrade() {
                    stream.cancel().await;
                }
            }
            .boxed()
        });
        *lock(&stream.hook) = Some(hook);

        stream
    }

    /// Stop accepting events, deliver what is already queued, then close.
    /// Only the first call does anything.
    pub async fn close(&self) {
        self.shutdown(None).await;
    }

    /// Report the process session as cancelled, then close.
    pub async fn cancel(&self) {
        let session_id = lock(&self.converter).process_session_id().to_string();
        info!(session_id = %session_id, "Reporting session as cancelled");
        self.shutdown(Some(GardenEvent::session_cancelled(session_id)))
            .await;
    }

    async fn shutdown(&self, last: Option<GardenEvent>) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        for id in &self.subscriptions {
            self.bus.off_any(id);
        }
        let forwarder = lock(&self.forwarder).take();
        if let Some(forwarder) = forwarder {
            if let Err(e) = forwarder.await {
                debug!(error = %e, "Event forwarder stopped abnormally");
            }
        }

        if let Some(event) = last {
            let envelopes = lock(&self.converter).convert(&event);
            for envelope in envelopes {
                if let Err(e) = self.inner.append(envelope) {
                    debug!(error = %e, "Dropping final event");
                }
            }
        }

        let hook = lock(&self.hook).take();
        if let Some(hook) = hook {
            self.hooks.unregister(hook);
        }

        self.inner.close().await;
    }

    /// Outcome of the background delivery loop.
    pub async fn wait(&self) -> Result<(), StreamError> {
        self.inner.wait().await
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.buffered_len()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn process_session_id(&self) -> String {
        lock(&self.converter).process_session_id().to_string()
    }
}

async fn forward(
    mut events: mpsc::UnboundedReceiver<GardenEvent>,
    converter: Arc<Mutex<GrpcEventConverter>>,
    stream: Arc<OrderedAckStream<Envelope>>,
) {
    while let Some(event) = events.recv().await {
        let envelopes = lock(&converter).convert(&event);
        for envelope in envelopes {
            if let Err(e) = stream.append(envelope) {
                debug!(error = %e, event = %event.name(), "Dropping event");
            }
        }
    }
    debug!("Event forwarder finished");
}

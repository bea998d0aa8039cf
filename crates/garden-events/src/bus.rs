use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::event::{GardenEvent, LogLevel};

/// Subscription identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub uuid::Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a subscription receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionFilter {
    /// Every event except log entries.
    Events,
    /// Log entries at `max_level` or more severe.
    Logs { max_level: LogLevel },
}

struct Subscription {
    id: SubscriptionId,
    filter: SubscriptionFilter,
    sender: mpsc::UnboundedSender<GardenEvent>,
}

impl Subscription {
    fn matches(&self, event: &GardenEvent) -> bool {
        match (self.filter, event.log_level()) {
            (SubscriptionFilter::Events, None) => true,
            (SubscriptionFilter::Logs { max_level }, Some(level)) => level <= max_level,
            _ => false,
        }
    }
}

/// In-process event bus.
///
/// Emitting never blocks: every subscriber owns an unbounded queue, so slow
/// consumers cannot stall the command that produced the event.
pub struct EventBus {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(
        &self,
        filter: SubscriptionFilter,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<GardenEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (self.subscribe_into(filter, sender), receiver)
    }

    /// Deliver matching events into an existing queue.
    ///
    /// Several subscriptions sharing one queue observe events in emit order,
    /// which separate receivers cannot guarantee.
    pub fn subscribe_into(
        &self,
        filter: SubscriptionFilter,
        sender: mpsc::UnboundedSender<GardenEvent>,
    ) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscriptions().push(Subscription {
            id: id.clone(),
            filter,
            sender,
        });
        debug!(subscription_id = %id, ?filter, "New subscription registered");
        id
    }

    /// Subscribe to every non-log event.
    pub fn on_any(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<GardenEvent>) {
        self.subscribe(SubscriptionFilter::Events)
    }

    /// Subscribe to log entries at `max_level` or more severe.
    pub fn on_log(
        &self,
        max_level: LogLevel,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<GardenEvent>) {
        self.subscribe(SubscriptionFilter::Logs { max_level })
    }

    /// Remove a subscription. Events already queued stay readable; the
    /// receiver then observes end-of-stream.
    pub fn off_any(&self, id: &SubscriptionId) -> bool {
        let mut subs = self.subscriptions();
        let before = subs.len();
        subs.retain(|s| s.id != *id);
        let removed = subs.len() != before;
        if removed {
            debug!(subscription_id = %id, "Subscription removed");
        }
        removed
    }

    /// Deliver an event to all matching subscribers.
    /// Returns the number of subscribers that received it.
    pub fn emit(&self, event: GardenEvent) -> usize {
        let mut subs = self.subscriptions();
        let mut delivered = 0;
        let before = subs.len();

        subs.retain(|sub| {
            if !sub.matches(&event) {
                return true;
            }
            match sub.sender.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });

        if subs.len() != before {
            debug!(removed = before - subs.len(), "Cleaned up closed subscriptions");
        }
        trace!(event = %event.name(), delivered, "Event emitted");

        delivered
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EmptyPayload, EventContext, LogEntryPayload};
    use chrono::Utc;

    fn log(level: LogLevel, message: &str) -> GardenEvent {
        GardenEvent::LogEntry(LogEntryPayload {
            context: EventContext::default(),
            level,
            message: message.to_string(),
            section: None,
            action_name: None,
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let bus = EventBus::new();
        let (_id, mut rx) = bus.on_any();

        let delivered = bus.emit(GardenEvent::session_cancelled("s-1"));
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, GardenEvent::session_cancelled("s-1"));
    }

    #[tokio::test]
    async fn log_entries_only_reach_log_subscribers() {
        let bus = EventBus::new();
        let (_events, mut events_rx) = bus.on_any();
        let (_logs, mut logs_rx) = bus.on_log(LogLevel::Info);

        assert_eq!(bus.emit(log(LogLevel::Warn, "careful")), 1);
        assert_eq!(bus.emit(log(LogLevel::Debug, "noise")), 0);
        assert_eq!(bus.emit(GardenEvent::TaskGraphComplete(EmptyPayload {})), 1);

        let first = logs_rx.recv().await.unwrap();
        assert_eq!(first.log_level(), Some(LogLevel::Warn));
        assert!(logs_rx.try_recv().is_err());

        let only = events_rx.recv().await.unwrap();
        assert!(only.log_level().is_none());
        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn off_any_keeps_queued_events_then_ends_stream() {
        let bus = EventBus::new();
        let (id, mut rx) = bus.on_any();

        bus.emit(GardenEvent::session_cancelled("a"));
        assert!(bus.off_any(&id));
        assert_eq!(bus.emit(GardenEvent::session_cancelled("b")), 0);

        assert_eq!(rx.recv().await, Some(GardenEvent::session_cancelled("a")));
        assert_eq!(rx.recv().await, None);
        assert!(!bus.off_any(&id));
    }

    #[tokio::test]
    async fn shared_queue_preserves_emit_order() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = bus.subscribe_into(SubscriptionFilter::Events, tx.clone());
        let logs = bus.subscribe_into(SubscriptionFilter::Logs { max_level: LogLevel::Silly }, tx);

        bus.emit(GardenEvent::session_cancelled("a"));
        bus.emit(log(LogLevel::Info, "between"));
        bus.emit(GardenEvent::session_cancelled("b"));

        assert_eq!(rx.recv().await, Some(GardenEvent::session_cancelled("a")));
        assert_eq!(rx.recv().await.and_then(|e| e.log_level()), Some(LogLevel::Info));
        assert_eq!(rx.recv().await, Some(GardenEvent::session_cancelled("b")));

        bus.off_any(&events);
        bus.off_any(&logs);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn closed_subscriber_cleaned_up() {
        let bus = EventBus::new();
        let (_id, rx) = bus.on_any();
        drop(rx);

        bus.emit(GardenEvent::session_cancelled("s"));
        assert_eq!(bus.subscription_count(), 0);
    }
}

use thiserror::Error;

/// Errors from event bus operations.
#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("unknown event name: {0}")]
    UnknownEvent(String),

    #[error("malformed event payload: {0}")]
    Malformed(String),

    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),
}

impl From<serde_json::Error> for EventBusError {
    fn from(e: serde_json::Error) -> Self {
        EventBusError::Malformed(e.to_string())
    }
}

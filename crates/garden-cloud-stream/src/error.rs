use thiserror::Error;

/// Errors from a streaming attempt.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("failed to connect to ingestion endpoint: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("invalid ingestion endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("ingestion RPC failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("ingestion service reported an error: {0}")]
    ServerReported(String),

    #[error("malformed acknowledgement: {0}")]
    MalformedAck(String),

    #[error("event stream is closed")]
    Closed,

    #[error("unexpected streaming failure: {0}")]
    Unexpected(String),
}

impl StreamError {
    /// Transport-level failures are retried by the reconnect loop. Anything
    /// else is a programming or configuration problem.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StreamError::Connect(_) | StreamError::ServerReported(_) => true,
            StreamError::Rpc(status) => matches!(
                status.code(),
                tonic::Code::Unavailable
                    | tonic::Code::Unknown
                    | tonic::Code::Cancelled
                    | tonic::Code::DeadlineExceeded
                    | tonic::Code::Aborted
                    | tonic::Code::ResourceExhausted
                    | tonic::Code::Internal
            ),
            StreamError::InvalidEndpoint { .. }
            | StreamError::MalformedAck(_)
            | StreamError::Closed
            | StreamError::Unexpected(_) => false,
        }
    }
}

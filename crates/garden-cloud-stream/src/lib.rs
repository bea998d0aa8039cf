//! Buffered, ordered, at-least-once delivery of Garden events to Garden Cloud.
//!
//! Events from the [`garden_events::EventBus`] are converted into
//! [`Envelope`]s and kept in an insertion-ordered send buffer until the
//! ingestion service acknowledges them. A background loop keeps one
//! bidirectional `IngestEvents` call open, replaying the whole buffer on
//! every new connection before anything appended later.
//!
//! The machinery is generic ([`OrderedAckStream`]) over the buffered item and
//! the [`IngestionClient`] that carries it; [`CloudEventStream`] binds it to
//! the Garden protocol.

pub mod buffer;
pub mod client;
pub mod config;
pub mod converter;
pub mod envelope;
pub mod error;
pub mod grpc;
mod lifecycle;
pub mod ordered;
pub mod pb;
mod session;
pub mod stream;
pub mod ulid;
pub mod wire;

pub use buffer::SendBuffer;
pub use client::{AckStream, IngestionClient, OutboundStream};
pub use config::{FatalErrorPolicy, StreamConfig};
pub use converter::{EventConverter, GrpcEventConverter, SessionIdMap};
pub use envelope::{
    AckMessage, AckSeverity, Acknowledgement, ActionKind, Envelope, EnvelopePayload, Tracked,
};
pub use error::StreamError;
pub use grpc::GrpcIngestionClient;
pub use ordered::OrderedAckStream;
pub use stream::CloudEventStream;
pub use ulid::{Ulid, UlidError, UlidGenerator};

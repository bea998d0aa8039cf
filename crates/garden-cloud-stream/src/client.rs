use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::envelope::Acknowledgement;
use crate::error::StreamError;

/// Items written by the stream for the current connection attempt.
pub type OutboundStream<T> = UnboundedReceiverStream<T>;

/// Acknowledgements read back for the current connection attempt.
pub type AckStream = BoxStream<'static, Result<Acknowledgement, StreamError>>;

/// The remote ingestion RPC.
///
/// `open` is called once per connection attempt with a fresh outbound
/// stream. The returned ack stream ends when the remote closes its side.
#[async_trait]
pub trait IngestionClient<T>: Send + Sync + 'static {
    async fn open(&self, outbound: OutboundStream<T>) -> Result<AckStream, StreamError>;
}

//! Local ingestion endpoint that acknowledges every event.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use garden_cloud_stream::pb::v1::garden_event_ingestion_service_server::{
    GardenEventIngestionService, GardenEventIngestionServiceServer,
};
use garden_cloud_stream::pb::v1::{IngestEventsRequest, IngestEventsResponse};
use garden_cloud_stream::{AckSeverity, Acknowledgement, Ulid};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

/// Acknowledges each event with `success` and `final` as soon as it arrives.
#[derive(Debug, Clone, Default)]
pub struct MockIngestService {
    received: Arc<AtomicU64>,
    connections: Arc<AtomicU64>,
}

impl MockIngestService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received over all connections.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }
}

#[tonic::async_trait]
impl GardenEventIngestionService for MockIngestService {
    type IngestEventsStream = ReceiverStream<Result<IngestEventsResponse, Status>>;

    async fn ingest_events(
        &self,
        request: Request<Streaming<IngestEventsRequest>>,
    ) -> Result<Response<Self::IngestEventsStream>, Status> {
        let connection = self.connections.fetch_add(1, Ordering::SeqCst) + 1;
        info!(connection, "Client connected");

        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(64);
        let received = self.received.clone();

        tokio::spawn(async move {
            loop {
                let request = match inbound.message().await {
                    Ok(Some(request)) => request,
                    Ok(None) => break,
                    Err(status) => {
                        debug!(connection, error = %status, "Inbound stream failed");
                        break;
                    }
                };
                let Some(event) = request.event else {
                    continue;
                };

                let total = received.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(
                    connection,
                    event_id = %event.event_ulid,
                    session_id = %event.session_ulid,
                    total,
                    "Event received"
                );

                let id: Ulid = match event.event_ulid.parse() {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(connection, error = %e, "Event without a valid id, not acknowledging");
                        continue;
                    }
                };
                let ack = Acknowledgement::success(id)
                    .with_message(AckSeverity::Debug, format!("stored event #{}", total));
                if tx.send(Ok(IngestEventsResponse::from(&ack))).await.is_err() {
                    break;
                }
            }
            info!(connection, "Client disconnected");
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Serve `service` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    service: MockIngestService,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    F: Future<Output = ()>,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Mock ingestion endpoint listening on {}", addr);
    }

    tonic::transport::Server::builder()
        .add_service(GardenEventIngestionServiceServer::new(service))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
}

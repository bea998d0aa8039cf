//! tonic-backed ingestion client.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Endpoint;
use tracing::debug;

use crate::client::{AckStream, IngestionClient, OutboundStream};
use crate::envelope::{Acknowledgement, Envelope};
use crate::error::StreamError;
use crate::pb::v1::garden_event_ingestion_service_client::GardenEventIngestionServiceClient;
use crate::pb::v1::IngestEventsRequest;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens `IngestEvents` calls against a Garden Cloud endpoint.
///
/// Every attempt dials a fresh channel, so a reconnect never reuses a
/// half-broken HTTP/2 connection.
#[derive(Clone, Debug)]
pub struct GrpcIngestionClient {
    endpoint: String,
    auth_token: Option<String>,
    connect_timeout: Duration,
}

impl GrpcIngestionClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn endpoint_config(&self) -> Result<Endpoint, StreamError> {
        Endpoint::from_shared(self.endpoint.clone())
            .map(|e| e.connect_timeout(self.connect_timeout))
            .map_err(|e| StreamError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl IngestionClient<Envelope> for GrpcIngestionClient {
    async fn open(&self, outbound: OutboundStream<Envelope>) -> Result<AckStream, StreamError> {
        let channel = self.endpoint_config()?.connect().await?;
        debug!(endpoint = %self.endpoint, "Connected to ingestion endpoint");

        let mut request = tonic::Request::new(outbound.map(IngestEventsRequest::from));
        if let Some(token) = &self.auth_token {
            let value: AsciiMetadataValue = format!("Bearer {}", token)
                .parse()
                .map_err(|_| StreamError::Unexpected("auth token is not a valid header".into()))?;
            request.metadata_mut().insert("authorization", value);
        }

        let mut client = GardenEventIngestionServiceClient::new(channel);
        let inbound = client.ingest_events(request).await?.into_inner();

        Ok(inbound
            .map(|response| match response {
                Ok(response) => Acknowledgement::try_from(response),
                Err(status) => Err(StreamError::Rpc(status)),
            })
            .boxed())
    }
}

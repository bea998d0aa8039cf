// @generated
// Generated from: proto/garden/public/events/v1/events.proto
// Manual check-in for offline builds.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IngestEventsRequest {
    #[prost(message, optional, tag = "1")]
    pub event: ::core::option::Option<GardenEvent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GardenEvent {
    #[prost(string, tag = "1")]
    pub event_ulid: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub session_ulid: ::prost::alloc::string::String,
    #[prost(int64, tag = "3")]
    pub emitted_at_unix_ms: i64,
    #[prost(oneof = "garden_event::EventData", tags = "10, 11, 12, 13, 14, 15")]
    pub event_data: ::core::option::Option<garden_event::EventData>,
}

/// Nested message and enum types in `GardenEvent`.
pub mod garden_event {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum EventData {
        #[prost(message, tag = "10")]
        CommandExecutionStarted(super::CommandExecutionStarted),
        #[prost(message, tag = "11")]
        CommandExecutionCompleted(super::CommandExecutionCompleted),
        #[prost(message, tag = "12")]
        CommandExecutionFailed(super::CommandExecutionFailed),
        #[prost(message, tag = "13")]
        CommandExecutionCancelled(super::CommandExecutionCancelled),
        #[prost(message, tag = "14")]
        ActionStatusChanged(super::ActionStatusChanged),
        #[prost(message, tag = "15")]
        LogEntry(super::LogEntry),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandExecutionStarted {
    #[prost(string, tag = "1")]
    pub command_ulid: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub command_name: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "3")]
    pub args: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, tag = "4")]
    pub project_root: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub project_name: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub environment_name: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "7")]
    pub namespace: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "8")]
    pub parent_session_ulid: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "9")]
    pub client_version: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandExecutionCompleted {
    #[prost(string, tag = "1")]
    pub command_ulid: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandExecutionFailed {
    #[prost(string, tag = "1")]
    pub command_ulid: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "2")]
    pub errors: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandExecutionCancelled {
    #[prost(string, tag = "1")]
    pub command_ulid: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionStatusChanged {
    #[prost(string, tag = "1")]
    pub command_ulid: ::prost::alloc::string::String,
    #[prost(enumeration = "ActionKind", tag = "2")]
    pub kind: i32,
    #[prost(string, tag = "3")]
    pub action_name: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub action_uid: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub state: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "6")]
    pub status: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogEntry {
    #[prost(string, tag = "1")]
    pub command_ulid: ::prost::alloc::string::String,
    #[prost(enumeration = "LogLevel", tag = "2")]
    pub level: i32,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "4")]
    pub section: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "5")]
    pub action_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(int64, tag = "6")]
    pub timestamp_unix_ms: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerMessage {
    #[prost(enumeration = "Severity", tag = "1")]
    pub severity: i32,
    #[prost(string, tag = "2")]
    pub text: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IngestEventsResponse {
    #[prost(string, tag = "1")]
    pub event_ulid: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub success: bool,
    #[prost(bool, tag = "3")]
    pub r#final: bool,
    #[prost(message, repeated, tag = "4")]
    pub messages: ::prost::alloc::vec::Vec<ServerMessage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ActionKind {
    Unspecified = 0,
    Build = 1,
    Deploy = 2,
    Run = 3,
    Test = 4,
}

impl ActionKind {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "ACTION_KIND_UNSPECIFIED",
            Self::Build => "ACTION_KIND_BUILD",
            Self::Deploy => "ACTION_KIND_DEPLOY",
            Self::Run => "ACTION_KIND_RUN",
            Self::Test => "ACTION_KIND_TEST",
        }
    }

    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "ACTION_KIND_UNSPECIFIED" => Some(Self::Unspecified),
            "ACTION_KIND_BUILD" => Some(Self::Build),
            "ACTION_KIND_DEPLOY" => Some(Self::Deploy),
            "ACTION_KIND_RUN" => Some(Self::Run),
            "ACTION_KIND_TEST" => Some(Self::Test),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum LogLevel {
    Unspecified = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Verbose = 4,
    Debug = 5,
    Silly = 6,
}

impl LogLevel {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "LOG_LEVEL_UNSPECIFIED",
            Self::Error => "LOG_LEVEL_ERROR",
            Self::Warn => "LOG_LEVEL_WARN",
            Self::Info => "LOG_LEVEL_INFO",
            Self::Verbose => "LOG_LEVEL_VERBOSE",
            Self::Debug => "LOG_LEVEL_DEBUG",
            Self::Silly => "LOG_LEVEL_SILLY",
        }
    }

    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "LOG_LEVEL_UNSPECIFIED" => Some(Self::Unspecified),
            "LOG_LEVEL_ERROR" => Some(Self::Error),
            "LOG_LEVEL_WARN" => Some(Self::Warn),
            "LOG_LEVEL_INFO" => Some(Self::Info),
            "LOG_LEVEL_VERBOSE" => Some(Self::Verbose),
            "LOG_LEVEL_DEBUG" => Some(Self::Debug),
            "LOG_LEVEL_SILLY" => Some(Self::Silly),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Severity {
    Unspecified = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
}

impl Severity {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "SEVERITY_UNSPECIFIED",
            Self::Debug => "SEVERITY_DEBUG",
            Self::Info => "SEVERITY_INFO",
            Self::Warning => "SEVERITY_WARNING",
            Self::Error => "SEVERITY_ERROR",
        }
    }

    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "SEVERITY_UNSPECIFIED" => Some(Self::Unspecified),
            "SEVERITY_DEBUG" => Some(Self::Debug),
            "SEVERITY_INFO" => Some(Self::Info),
            "SEVERITY_WARNING" => Some(Self::Warning),
            "SEVERITY_ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

pub mod garden_event_ingestion_service_client {
    #![allow(clippy::derive_partial_eq_without_eq)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct GardenEventIngestionServiceClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl GardenEventIngestionServiceClient<tonic::transport::Channel> {
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> GardenEventIngestionServiceClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::ResponseBody: Body + Send + 'static,
        T::Error: Into<StdError>,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
        <T::ResponseBody as Body>::Data: Into<Bytes> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        pub async fn ingest_events(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::IngestEventsRequest>,
        ) -> Result<
            tonic::Response<tonic::codec::Streaming<super::IngestEventsResponse>>,
            tonic::Status,
        > {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = tonic::codegen::http::uri::PathAndQuery::from_static(
                "/garden.public.events.v1.GardenEventIngestionService/IngestEvents",
            );
            self.inner
                .streaming(request.into_streaming_request(), path, codec)
                .await
        }
    }
}

pub mod garden_event_ingestion_service_server {
    #![allow(clippy::derive_partial_eq_without_eq)]
    use tonic::codegen::*;

    #[tonic::async_trait]
    pub trait GardenEventIngestionService: Send + Sync + 'static {
        type IngestEventsStream: tonic::codegen::tokio_stream::Stream<
                Item = Result<super::IngestEventsResponse, tonic::Status>,
            > + Send
            + 'static;

        async fn ingest_events(
            &self,
            request: tonic::Request<tonic::Streaming<super::IngestEventsRequest>>,
        ) -> Result<tonic::Response<Self::IngestEventsStream>, tonic::Status>;
    }

    #[derive(Debug, Clone)]
    pub struct GardenEventIngestionServiceServer<T: GardenEventIngestionService> {
        inner: Arc<T>,
    }

    impl<T: GardenEventIngestionService> GardenEventIngestionServiceServer<T> {
        pub fn new(inner: T) -> Self {
            Self {
                inner: Arc::new(inner),
            }
        }
    }

    impl<T: GardenEventIngestionService> Service<http::Request<tonic::body::BoxBody>>
        for GardenEventIngestionServiceServer<T>
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<tonic::body::BoxBody>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/garden.public.events.v1.GardenEventIngestionService/IngestEvents" => {
                    struct IngestEventsSvc<T: GardenEventIngestionService>(pub Arc<T>);
                    impl<T: GardenEventIngestionService>
                        tonic::server::StreamingService<super::IngestEventsRequest>
                        for IngestEventsSvc<T>
                    {
                        type Response = super::IngestEventsResponse;
                        type ResponseStream = T::IngestEventsStream;
                        type Future =
                            BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<tonic::Streaming<super::IngestEventsRequest>>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            Box::pin(async move { inner.ingest_events(request).await })
                        }
                    }
                    Box::pin(async move {
                        let method = IngestEventsSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        let res = grpc.streaming(method, req).await;
                        Ok(res)
                    })
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(tonic::body::empty_body())
                        .unwrap())
                }),
            }
        }
    }

    impl<T: GardenEventIngestionService> tonic::server::NamedService
        for GardenEventIngestionServiceServer<T>
    {
        const NAME: &'static str = "garden.public.events.v1.GardenEventIngestionService";
    }
}

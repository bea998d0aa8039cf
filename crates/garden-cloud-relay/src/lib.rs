//! Garden Cloud relay
//!
//! - [`relay::run`]: stream JSON-lines Garden events to an ingestion endpoint
//! - [`mock::serve`]: a local ingestion endpoint that acknowledges everything

pub mod config;
pub mod mock;
pub mod relay;

pub use config::{CloudConfig, LoggingConfig, RelayConfig};
pub use mock::MockIngestService;
pub use relay::RelaySummary;

//! Routing and ingestion of legislative session records.
//!
//! The router decides per request whether the structured archive or the
//! transcription service should serve a meeting date, calls that source's
//! adapter, and falls back to the other source once if it fails. Adapter
//! crates and the resilient fetch layer are re-exported so callers only depend
//! on `domain`.

pub use resilient_fetch::{ExecutorConfig, FetchExecutor, FetchStatistics};
pub use session_sources::{DataSource, Meeting, Normalized, SourceAdapter, Speech};

pub mod error;
pub mod gateway;
pub mod router;
pub mod routing;
pub mod sink;
pub mod statistics;

pub use router::{IngestionResult, IngestionRouter};
pub use routing::{IngestionRequest, RoutingConfig, RoutingDecision};
pub use statistics::RoutingStatistics;

//! # resilient-fetch
//!
//! The single outbound HTTP path shared by every upstream source:
//! - Token-bucket rate limiting with a hard ceiling on request rate
//! - TTL response cache that can serve stale data during upstream outages
//! - Job tracking with an append-only status history per fetch
//! - Retry with capped exponential backoff for transient failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resilient_fetch::{ExecutorConfig, FetchExecutor};
//!
//! let executor = FetchExecutor::new(ExecutorConfig::default())?;
//! let result = executor.fetch(url, &params, Duration::from_secs(3600)).await?;
//! ```

pub mod cache;
pub mod error;
pub mod executor;
pub mod http;
pub mod jobs;
pub mod rate_limiter;

// Re-export commonly used types
pub use error::{FetchError, FetchErrorKind};
pub use executor::{ExecutorConfig, FetchExecutor, FetchResult, FetchStatistics};
pub use jobs::{FetchJob, JobStatus};

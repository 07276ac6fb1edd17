//! Source abstraction layer for legislative session records.
//!
//! This crate provides the contract every upstream source implements:
//! - Canonical meeting and speech records shared by all sources
//! - The `SourceAdapter` trait (fetch raw payload, normalize it)
//! - A source-agnostic error type that maps fetch failures onto
//!   "unavailable" (fall back) and "permanent" (request is wrong)
//!
//! Adapters know nothing about each other; choosing between them and falling
//! back is the router's job.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::Error;
pub use traits::adapter::SourceAdapter;
#[cfg(any(test, feature = "mock"))]
pub use traits::adapter::MockSourceAdapter;
pub use types::records::{DataSource, Meeting, Normalized, RawPayload, Speech};

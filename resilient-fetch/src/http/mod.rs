//! HTTP client building and retry policy.

mod client;
mod retry;

pub use client::{HttpClientBuilder, HttpClientConfig};
pub use retry::ExponentialBackoff;

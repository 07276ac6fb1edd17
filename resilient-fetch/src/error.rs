//! Error types for the `resilient-fetch` crate.
//!
//! Follows the same pattern as the other layers: a root error struct holding a
//! kind enum and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Failure of a fetch after the retry budget was spent (or a non-retryable failure).
#[derive(Debug)]
pub struct FetchError {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub kind: FetchErrorKind,
    /// Network attempts made before giving up.
    pub attempts: u32,
}

/// Categories of fetch failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchErrorKind {
    /// The attempt exceeded the hard per-fetch timeout.
    Timeout,
    /// Connection refused, reset, or otherwise broken before a response arrived.
    Connection,
    /// Upstream answered with a 5xx or 408.
    Upstream(u16),
    /// Upstream answered with 429.
    Throttled,
    /// Upstream answered with a 4xx other than 408/429.
    Client(u16),
    /// The response body was not valid JSON.
    Malformed,
    /// The request could not be built (bad URL, client misconfiguration).
    Builder,
}

impl FetchErrorKind {
    /// Transient kinds are retried with backoff; everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchErrorKind::Timeout
                | FetchErrorKind::Connection
                | FetchErrorKind::Upstream(_)
                | FetchErrorKind::Throttled
        )
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::Connection => write!(f, "connection failure"),
            FetchErrorKind::Upstream(status) => write!(f, "upstream error {status}"),
            FetchErrorKind::Throttled => write!(f, "throttled by upstream (429)"),
            FetchErrorKind::Client(status) => write!(f, "request rejected {status}"),
            FetchErrorKind::Malformed => write!(f, "malformed response"),
            FetchErrorKind::Builder => write!(f, "invalid request"),
        }
    }
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, attempts: u32) -> Self {
        FetchError {
            source: None,
            kind,
            attempts,
        }
    }

    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} after {} attempt(s)", self.kind, self.attempts)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for FetchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_builder() {
            FetchErrorKind::Builder
        } else if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if err.is_decode() {
            FetchErrorKind::Malformed
        } else if let Some(status) = err.status() {
            classify_status(status.as_u16())
        } else {
            FetchErrorKind::Connection
        };

        FetchError {
            source: Some(Box::new(err)),
            kind,
            attempts: 0,
        }
    }
}

/// Map a non-success HTTP status onto an error kind.
pub(crate) fn classify_status(status: u16) -> FetchErrorKind {
    match status {
        429 => FetchErrorKind::Throttled,
        408 | 500..=599 => FetchErrorKind::Upstream(status),
        _ => FetchErrorKind::Client(status),
    }
}

//! Error types for the `domain` layer.
use resilient_fetch::{FetchError, FetchErrorKind};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
///
/// Ingestion itself never fails with this type: routed ingestion reports failure
/// through `IngestionResult::success`. These errors come from wiring the
/// pipeline together (building clients, adapters and the router). Lower-layer
/// errors are translated here so callers do not depend on `resilient-fetch`
/// directly.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        // Builder errors happen before any network call is made.
        let error_kind = if err.kind == FetchErrorKind::Builder {
            DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to build HTTP client".to_string(),
            ))
        } else {
            DomainErrorKind::External(ExternalErrorKind::Network)
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                "Failed to write records".to_string(),
            )),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to serialize record".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_failure_is_internal() {
        let err: Error = FetchError::new(FetchErrorKind::Builder, 0).into();
        assert!(matches!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Other(_))
        ));
    }

    #[test]
    fn network_failure_is_external() {
        let err: Error = FetchError::new(FetchErrorKind::Connection, 2).into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Network)
        );
        assert!(err.source().is_some());
    }
}

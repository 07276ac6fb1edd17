//! Error types for source adapters.

use std::fmt;

use resilient_fetch::FetchError;

use crate::types::records::DataSource;

/// Universal adapter error, independent of which upstream produced it.
#[derive(Debug)]
pub enum Error {
    /// Transient failures persisted past the retry budget. The router may fall back.
    Unavailable {
        source: DataSource,
        attempts: u32,
        message: String,
    },

    /// The upstream rejected the request or returned something unusable.
    /// Retrying the same request will not help.
    Permanent { source: DataSource, message: String },
}

impl Error {
    /// Translate a fetch failure for `source` into the adapter taxonomy.
    pub fn from_fetch(source: DataSource, err: FetchError) -> Self {
        if err.is_transient() {
            Error::Unavailable {
                source,
                attempts: err.attempts,
                message: err.to_string(),
            }
        } else {
            Error::Permanent {
                source,
                message: err.to_string(),
            }
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unavailable {
                source,
                attempts,
                message,
            } => write!(
                f,
                "{} source unavailable after {} attempt(s): {}",
                source, attempts, message
            ),
            Error::Permanent { source, message } => {
                write!(f, "{} request failed: {}", source, message)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use resilient_fetch::FetchErrorKind;

    #[test]
    fn transient_fetch_failure_is_unavailable() {
        let err = Error::from_fetch(
            DataSource::Realtime,
            FetchError::new(FetchErrorKind::Timeout, 4),
        );
        assert!(err.is_unavailable());
        assert_eq!(
            err.to_string(),
            "realtime source unavailable after 4 attempt(s): timeout after 4 attempt(s)"
        );
    }

    #[test]
    fn client_fetch_failure_is_permanent() {
        let err = Error::from_fetch(
            DataSource::Historical,
            FetchError::new(FetchErrorKind::Client(400), 1),
        );
        assert!(!err.is_unavailable());
        assert!(err.to_string().starts_with("historical request failed"));
    }
}

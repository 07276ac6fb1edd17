//! Source adapter trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::records::{DataSource, Normalized, RawPayload};
use crate::Error;

/// Abstraction over one upstream source of session records.
///
/// Implementations fetch through the shared resilient fetch executor and must
/// not add rate limiting or caching of their own. This trait lets the router
/// treat the archival API and the transcription service interchangeably.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter talks to.
    fn source(&self) -> DataSource;

    /// Fetch the raw upstream payload for one meeting date.
    ///
    /// `session_number` narrows the query when the upstream supports it.
    async fn fetch_raw(
        &self,
        meeting_date: NaiveDate,
        session_number: Option<u32>,
    ) -> std::result::Result<RawPayload, Error>;

    /// Convert a raw payload into canonical records.
    ///
    /// Total and pure: malformed records are skipped with a warning, never
    /// escalated, and the same payload always yields the same output.
    fn normalize(&self, raw: &RawPayload) -> Normalized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_adapter_is_usable_as_trait_object() {
        let mut mock = MockSourceAdapter::new();
        mock.expect_source().return_const(DataSource::Historical);
        mock.expect_fetch_raw().times(1).returning(|date, _| {
            Ok(RawPayload {
                source: DataSource::Historical,
                meeting_date: date,
                body: json!({"meetings": []}),
                from_cache: true,
                stale: false,
            })
        });

        let adapter: Box<dyn SourceAdapter> = Box::new(mock);
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let raw = adapter.fetch_raw(date, None).await.unwrap();

        assert_eq!(adapter.source(), DataSource::Historical);
        assert_eq!(raw.meeting_date, date);
        assert!(raw.from_cache);
    }
}

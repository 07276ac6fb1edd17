//! Client for the structured archive of finalized legislative sessions.
//!
//! The archive answers `GET {base}/meetings?date=YYYY-MM-DD[&session=N]` with
//! every meeting held that day and its speeches in delivery order.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::*;
use resilient_fetch::cache::Params;
use resilient_fetch::FetchExecutor;
use serde::Deserialize;
use serde_json::Value;
use session_sources::{DataSource, Error, Meeting, Normalized, RawPayload, SourceAdapter, Speech};
use std::sync::Arc;
use std::time::Duration;

/// Meeting record as published by the archive
#[derive(Debug, Deserialize)]
pub struct ArchiveMeeting {
    pub meeting_id: String,
    pub title: String,
    #[serde(default)]
    pub committee: Option<String>,
    #[serde(default)]
    pub session_number: Option<u32>,
    #[serde(default)]
    pub meeting_date: Option<NaiveDate>,
    #[serde(default)]
    pub speeches: Vec<Value>,
}

/// Speech record as published by the archive
#[derive(Debug, Deserialize)]
pub struct ArchiveSpeech {
    pub speaker: String,
    pub text: String,
}

/// Adapter for the archive API
pub struct HistoricalApiAdapter {
    executor: Arc<FetchExecutor>,
    base_url: String,
    cache_ttl: Duration,
}

impl HistoricalApiAdapter {
    pub fn new(executor: Arc<FetchExecutor>, base_url: &str, cache_ttl: Duration) -> Self {
        Self {
            executor,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_ttl,
        }
    }

    fn normalize_meeting(
        &self,
        index: usize,
        record: &Value,
        fallback_date: NaiveDate,
        out: &mut Normalized,
    ) {
        let meeting: ArchiveMeeting = match serde_json::from_value(record.clone()) {
            Ok(meeting) => meeting,
            Err(e) => {
                out.warnings
                    .push(format!("historical: skipped meeting record #{index}: {e}"));
                return;
            }
        };
        if meeting.meeting_id.trim().is_empty() {
            out.warnings.push(format!(
                "historical: skipped meeting record #{index}: empty meeting_id"
            ));
            return;
        }

        let mut sequence = 0;
        for (speech_index, raw_speech) in meeting.speeches.iter().enumerate() {
            let speech: ArchiveSpeech = match serde_json::from_value(raw_speech.clone()) {
                Ok(speech) => speech,
                Err(e) => {
                    out.warnings.push(format!(
                        "historical: skipped speech #{speech_index} of meeting {}: {e}",
                        meeting.meeting_id
                    ));
                    continue;
                }
            };
            if speech.text.trim().is_empty() {
                out.warnings.push(format!(
                    "historical: skipped speech #{speech_index} of meeting {}: empty text",
                    meeting.meeting_id
                ));
                continue;
            }
            sequence += 1;
            out.speeches.push(Speech {
                meeting_id: meeting.meeting_id.clone(),
                sequence,
                speaker: speech.speaker,
                text: speech.text,
                start_ms: None,
                end_ms: None,
                source: DataSource::Historical,
            });
        }

        out.meetings.push(Meeting {
            meeting_id: meeting.meeting_id,
            meeting_date: meeting.meeting_date.unwrap_or(fallback_date),
            session_number: meeting.session_number,
            committee: meeting.committee,
            title: meeting.title,
            source: DataSource::Historical,
        });
    }
}

#[async_trait]
impl SourceAdapter for HistoricalApiAdapter {
    fn source(&self) -> DataSource {
        DataSource::Historical
    }

    async fn fetch_raw(
        &self,
        meeting_date: NaiveDate,
        session_number: Option<u32>,
    ) -> Result<RawPayload, Error> {
        let url = format!("{}/meetings", self.base_url);
        let mut params = Params::new();
        params.insert("date".to_string(), meeting_date.to_string());
        if let Some(session) = session_number {
            params.insert("session".to_string(), session.to_string());
        }

        debug!("Querying archive for meetings on {}", meeting_date);

        let result = self
            .executor
            .fetch(&url, &params, self.cache_ttl)
            .await
            .map_err(|e| {
                warn!("Archive fetch for {} failed: {}", meeting_date, e);
                Error::from_fetch(DataSource::Historical, e)
            })?;

        if result.payload.get("meetings").and_then(Value::as_array).is_none() {
            warn!("Archive answered {} without a meetings array", meeting_date);
            self.executor.invalidate(&url, &params);
            return Err(Error::Permanent {
                source: DataSource::Historical,
                message: "payload has no meetings array".to_string(),
            });
        }

        Ok(RawPayload {
            source: DataSource::Historical,
            meeting_date,
            body: result.payload,
            from_cache: result.from_cache,
            stale: result.stale,
        })
    }

    fn normalize(&self, raw: &RawPayload) -> Normalized {
        let mut out = Normalized::default();
        if raw.stale {
            out.warnings.push(format!(
                "historical: served stale cached data for {}",
                raw.meeting_date
            ));
        }

        let Some(records) = raw.body.get("meetings").and_then(Value::as_array) else {
            out.warnings
                .push("historical: payload has no meetings array".to_string());
            return out;
        };

        for (index, record) in records.iter().enumerate() {
            self.normalize_meeting(index, record, raw.meeting_date, &mut out);
        }
        out
    }
}

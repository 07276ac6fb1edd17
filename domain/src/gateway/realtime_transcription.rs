//! Client for the transcription service covering the current session.
//!
//! The service answers `GET {base}/transcripts?date=YYYY-MM-DD[&session=N]`
//! with one transcript per recorded sitting. Only completed transcripts carry
//! utterances; each speaker-labelled utterance becomes one speech.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::*;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use resilient_fetch::cache::Params;
use resilient_fetch::FetchExecutor;
use serde::Deserialize;
use serde_json::Value;
use session_sources::{DataSource, Error, Meeting, Normalized, RawPayload, SourceAdapter, Speech};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error as DomainError;

/// Transcript processing status
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

/// Utterance (speaker segment) with timing
#[derive(Debug, Deserialize, Clone)]
pub struct Utterance {
    pub text: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub speaker: String,
}

/// Transcript of one recorded sitting
#[derive(Debug, Deserialize)]
pub struct TranscriptResponse {
    pub id: String,
    pub status: TranscriptStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub committee: Option<String>,
    #[serde(default)]
    pub session_number: Option<u32>,
    #[serde(default)]
    pub utterances: Vec<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Adapter for the transcription service
pub struct RealtimeTranscriptionAdapter {
    executor: Arc<FetchExecutor>,
    base_url: String,
    cache_ttl: Duration,
    headers: HeaderMap,
}

impl RealtimeTranscriptionAdapter {
    /// Create a new adapter; `api_key`, when present, is sent as the `authorization` header.
    pub fn new(
        executor: Arc<FetchExecutor>,
        base_url: &str,
        api_key: Option<&str>,
        cache_ttl: Duration,
    ) -> Result<Self, DomainError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut header_value = HeaderValue::from_str(key).map_err(|e| {
                warn!("Failed to create auth header: {:?}", e);
                DomainError::from(e)
            })?;
            header_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, header_value);
        }

        Ok(Self {
            executor,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_ttl,
            headers,
        })
    }

    fn normalize_transcript(&self, index: usize, record: &Value, raw: &RawPayload, out: &mut Normalized) {
        let transcript: TranscriptResponse = match serde_json::from_value(record.clone()) {
            Ok(transcript) => transcript,
            Err(e) => {
                out.warnings
                    .push(format!("realtime: skipped transcript record #{index}: {e}"));
                return;
            }
        };

        match transcript.status {
            TranscriptStatus::Completed => {}
            TranscriptStatus::Error => {
                out.warnings.push(format!(
                    "realtime: skipped transcript {}: transcription failed ({})",
                    transcript.id,
                    transcript.error.as_deref().unwrap_or("no reason given")
                ));
                return;
            }
            TranscriptStatus::Queued | TranscriptStatus::Processing => {
                out.warnings.push(format!(
                    "realtime: skipped transcript {}: not yet completed",
                    transcript.id
                ));
                return;
            }
        }

        let meeting_id = format!("rt-{}", transcript.id);
        let mut sequence = 0;
        for (utterance_index, raw_utterance) in transcript.utterances.iter().enumerate() {
            let utterance: Utterance = match serde_json::from_value(raw_utterance.clone()) {
                Ok(utterance) => utterance,
                Err(e) => {
                    out.warnings.push(format!(
                        "realtime: skipped utterance #{utterance_index} of transcript {}: {e}",
                        transcript.id
                    ));
                    continue;
                }
            };
            if utterance.text.trim().is_empty() || utterance.end < utterance.start {
                out.warnings.push(format!(
                    "realtime: skipped utterance #{utterance_index} of transcript {}: empty text or bad timing",
                    transcript.id
                ));
                continue;
            }
            sequence += 1;
            out.speeches.push(Speech {
                meeting_id: meeting_id.clone(),
                sequence,
                speaker: utterance.speaker,
                text: utterance.text,
                start_ms: Some(utterance.start),
                end_ms: Some(utterance.end),
                source: DataSource::Realtime,
            });
        }

        out.meetings.push(Meeting {
            meeting_id,
            meeting_date: raw.meeting_date,
            session_number: transcript.session_number,
            committee: transcript.committee,
            title: transcript
                .title
                .unwrap_or_else(|| format!("Session recording {}", raw.meeting_date)),
            source: DataSource::Realtime,
        });
    }
}

fn is_unfinished(record: &Value) -> bool {
    matches!(
        record.get("status").and_then(Value::as_str),
        Some("queued" | "processing")
    )
}

#[async_trait]
impl SourceAdapter for RealtimeTranscriptionAdapter {
    fn source(&self) -> DataSource {
        DataSource::Realtime
    }

    async fn fetch_raw(
        &self,
        meeting_date: NaiveDate,
        session_number: Option<u32>,
    ) -> Result<RawPayload, Error> {
        let url = format!("{}/transcripts", self.base_url);
        let mut params = Params::new();
        params.insert("date".to_string(), meeting_date.to_string());
        if let Some(session) = session_number {
            params.insert("session".to_string(), session.to_string());
        }

        debug!("Requesting transcripts for {}", meeting_date);

        let result = self
            .executor
            .fetch_with_headers(&url, &params, self.cache_ttl, &self.headers)
            .await
            .map_err(|e| {
                warn!("Transcript fetch for {} failed: {}", meeting_date, e);
                Error::from_fetch(DataSource::Realtime, e)
            })?;

        let Some(transcripts) = result.payload.get("transcripts").and_then(Value::as_array) else {
            warn!("Transcription service answered {} without a transcripts array", meeting_date);
            self.executor.invalidate(&url, &params);
            return Err(Error::Permanent {
                source: DataSource::Realtime,
                message: "payload has no transcripts array".to_string(),
            });
        };

        // Unfinished transcripts will change; the next request must see the update.
        if transcripts.iter().any(is_unfinished) {
            debug!("Transcripts for {} still in progress, not caching", meeting_date);
            self.executor.invalidate(&url, &params);
        }

        Ok(RawPayload {
            source: DataSource::Realtime,
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
                "realtime: served stale cached data for {}",
                raw.meeting_date
            ));
        }

        let Some(records) = raw.body.get("transcripts").and_then(Value::as_array) else {
            out.warnings
                .push("realtime: payload has no transcripts array".to_string());
            return out;
        };

        for (index, record) in records.iter().enumerate() {
            self.normalize_transcript(index, record, raw, &mut out);
        }
        out
    }
}

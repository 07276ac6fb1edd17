//! Canonical records produced by every source.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Upstream a record (or a routing decision) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Structured archive of finalized sessions.
    Historical,
    /// Transcription of recent session audio.
    Realtime,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Historical => "historical",
            DataSource::Realtime => "realtime",
        }
    }

    /// The source used for fallback.
    pub fn other(&self) -> DataSource {
        match self {
            DataSource::Historical => DataSource::Realtime,
            DataSource::Realtime => DataSource::Historical,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct DataSourceParseError;

impl fmt::Display for DataSourceParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected `historical` or `realtime`")
    }
}

impl std::error::Error for DataSourceParseError {}

impl FromStr for DataSource {
    type Err = DataSourceParseError;
    fn from_str(source: &str) -> Result<DataSource, Self::Err> {
        match source.to_lowercase().as_str() {
            "historical" => Ok(DataSource::Historical),
            "realtime" => Ok(DataSource::Realtime),
            _ => Err(DataSourceParseError),
        }
    }
}

/// One sitting of a plenary or committee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub meeting_id: String,
    pub meeting_date: NaiveDate,
    pub session_number: Option<u32>,
    pub committee: Option<String>,
    pub title: String,
    pub source: DataSource,
}

/// One speaker turn within a meeting, in delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    pub meeting_id: String,
    pub sequence: u32,
    pub speaker: String,
    pub text: String,
    /// Offsets into the recording, only known for transcribed speeches.
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
    pub source: DataSource,
}

/// Unparsed upstream response for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub source: DataSource,
    pub meeting_date: NaiveDate,
    pub body: Value,
    pub from_cache: bool,
    /// Served from an expired cache entry because the upstream was down.
    pub stale: bool,
}

/// Output of normalization: the records that parsed, plus a warning per skipped record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub meetings: Vec<Meeting>,
    pub speeches: Vec<Speech>,
    pub warnings: Vec<String>,
}

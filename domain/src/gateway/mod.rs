//! Source adapters for the two upstreams.

pub mod historical_api;
pub mod realtime_transcription;

pub use historical_api::HistoricalApiAdapter;
pub use realtime_transcription::RealtimeTranscriptionAdapter;

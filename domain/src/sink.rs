//! Downstream persistence of normalized records.
//!
//! Ingestion never persists on its own; callers hand the records in an
//! `IngestionResult` to whichever sink they use.

use crate::error::Error;
use async_trait::async_trait;
use serde::Serialize;
use session_sources::{Meeting, Speech};
use std::io::Write;

#[async_trait]
pub trait RecordSink: Send {
    /// Persist a batch of records, returning how many were written.
    async fn write_records(
        &mut self,
        meetings: &[Meeting],
        speeches: &[Speech],
    ) -> Result<usize, Error>;
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Line<'a> {
    Meeting(&'a Meeting),
    Speech(&'a Speech),
}

/// Writes one JSON object per line, meetings before speeches.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<(), Error> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    async fn write_records(
        &mut self,
        meetings: &[Meeting],
        speeches: &[Speech],
    ) -> Result<usize, Error> {
        for meeting in meetings {
            self.write_line(&Line::Meeting(meeting))?;
        }
        for speech in speeches {
            self.write_line(&Line::Speech(speech))?;
        }
        self.writer.flush()?;
        Ok(meetings.len() + speeches.len())
    }
}

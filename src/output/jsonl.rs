//! JSON-lines record sink
//!
//! Writes each record's field map as one JSON object per line, either to a file
//! or to stdout.

use crate::output::traits::{OutputResult, RecordSink};
use crate::output::Record;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Sink writing one JSON object per record
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    /// Appends records to the file at `path`, creating it if needed
    pub fn to_file(path: &Path) -> OutputResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// Writes records to stdout
    pub fn to_stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn write_record(&self, record: &Record) -> OutputResult<()> {
        let line = serde_json::to_string(&record.to_fields())?;
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", line)?;
        Ok(())
    }

    /// Flushes buffered records
    pub fn flush(&self) -> OutputResult<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.flush()?;
        Ok(())
    }
}

impl RecordSink for JsonLinesSink {
    fn accept(&self, record: Record) {
        if let Err(e) = self.write_record(&record) {
            tracing::error!(
                reference = %record.reference(),
                error = %e,
                "Failed to write record"
            );
        }
    }
}

//! Record sink trait and output errors

use crate::output::Record;
use thiserror::Error;

/// Errors that can occur while writing records
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Consumer of emitted records
///
/// Called concurrently from crawl tasks. A sink that cannot deliver a record
/// logs the failure itself; the crawl does not react to sink errors.
pub trait RecordSink: Send + Sync {
    fn accept(&self, record: Record);
}

impl<F> RecordSink for F
where
    F: Fn(Record) + Send + Sync,
{
    fn accept(&self, record: Record) {
        self(record)
    }
}

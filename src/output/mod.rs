//! Output module for crawl records
//!
//! This module handles:
//! - The add and delete records a run emits
//! - The sink interface records are handed to
//! - A JSON-lines sink for the command-line front end
//! - Per-run statistics

mod jsonl;
mod record;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use record::{
    Command, CrawlRecord, DeleteRecord, Record, FIELD_CHILD, FIELD_COMMAND, FIELD_CONTENT,
    FIELD_CONTEXT, FIELD_EPOCH, FIELD_EXTERNAL, FIELD_REFERENCE, FIELD_STATUS, FIELD_URL,
    FIELD_UUID,
};
pub use stats::{print_summary, RunStats, RunSummary};
pub use traits::{OutputError, OutputResult, RecordSink};

use std::sync::Mutex;

/// Sink that keeps every record in memory
///
/// Useful for embedding the crawler and for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<Record>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything received so far
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// URLs of the add records received so far
    pub fn added_urls(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter_map(Record::as_add)
            .map(|record| record.url.clone())
            .collect()
    }

    /// References of the delete records received so far
    pub fn deleted_references(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                Record::Delete(delete) => Some(delete.reference),
                Record::Add(_) => None,
            })
            .collect()
    }
}

impl RecordSink for CollectingSink {
    fn accept(&self, record: Record) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}

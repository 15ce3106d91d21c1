//! Run reconciliation
//!
//! At the end of a run the URLs visited are compared with those saved by the
//! previous run of the same seed. Every URL that disappeared is reported as a
//! delete record, then the current list replaces the saved one.

use crate::output::{DeleteRecord, Record, RecordSink, RunStats};
use crate::storage::{run_id_for, JsonRunStateStore, RunStateStore};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Returns one delete record per `prior` URL missing from `current`
///
/// URLs are compared as exact strings. Deletions come out in `prior` order.
pub fn reconcile(current: &[String], prior: &[String]) -> Vec<DeleteRecord> {
    let current: HashSet<&str> = current.iter().map(String::as_str).collect();

    prior
        .iter()
        .filter(|url| !current.contains(url.as_str()))
        .map(|url| DeleteRecord::for_url(url))
        .collect()
}

/// Loads, diffs and replaces the saved state of one seed
pub struct Reconciler {
    store: Option<Arc<dyn RunStateStore>>,
    run_id: String,
}

impl Reconciler {
    /// Creates a reconciler; without a store reconciliation is skipped
    pub fn new(store: Option<Arc<dyn RunStateStore>>, run_id: &str) -> Self {
        Self {
            store,
            run_id: run_id.to_string(),
        }
    }

    /// Creates a reconciler backed by JSON files under `data_folder`
    pub fn for_data_folder(data_folder: Option<&Path>, seed_url: &str) -> Self {
        let store = data_folder
            .map(|folder| Arc::new(JsonRunStateStore::new(folder)) as Arc<dyn RunStateStore>);
        Self::new(store, &run_id_for(seed_url))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Emits deletions for the run that just finished and saves its URLs
    ///
    /// Unreadable prior state suppresses deletions for this run only; the
    /// current list is still saved. A failed save is logged and leaves the
    /// previous state in place.
    ///
    /// # Returns
    ///
    /// The number of delete records emitted
    pub fn finish_run(&self, current: &[String], sink: &dyn RecordSink, stats: &RunStats) -> u64 {
        let store = match &self.store {
            Some(store) => store,
            None => {
                tracing::debug!("No data folder configured, skipping reconciliation");
                return 0;
            }
        };

        let deletions = match store.load(&self.run_id) {
            Ok(Some(prior)) => reconcile(current, &prior),
            Ok(None) => {
                tracing::info!(run_id = %self.run_id, "No previous run state, nothing to delete");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(
                    run_id = %self.run_id,
                    error = %e,
                    "Failed to read previous run state, skipping deletions"
                );
                Vec::new()
            }
        };

        let deleted = deletions.len() as u64;
        for deletion in deletions {
            tracing::debug!(reference = %deletion.reference, "Deleting page missing from this run");
            sink.accept(Record::Delete(deletion));
        }
        stats.record_deleted(deleted);

        match store.save(&self.run_id, current) {
            Ok(()) => {
                tracing::info!(run_id = %self.run_id, urls = current.len(), deleted, "Saved run state")
            }
            Err(e) => tracing::error!(run_id = %self.run_id, error = %e, "Failed to save run state"),
        }

        deleted
    }
}

//! Storage traits and error types
//!
//! This module defines the trait interface for run-state backends and
//! associated error types.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Corrupt run state in {path}: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persisted list of URLs visited by the most recent completed run
///
/// Implementations must replace state atomically: after a crash a reader sees
/// either the previous list or the new one, never a partial write.
pub trait RunStateStore: Send + Sync {
    /// Loads the URLs saved for `run_id`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(urls))` - State saved by an earlier run
    /// * `Ok(None)` - No earlier run saved state
    /// * `Err(StorageError)` - State exists but cannot be read
    fn load(&self, run_id: &str) -> StorageResult<Option<Vec<String>>>;

    /// Replaces the URLs saved for `run_id`
    fn save(&self, run_id: &str, urls: &[String]) -> StorageResult<()>;

    /// Forgets the state saved for `run_id`, returning whether any existed
    fn clear(&self, run_id: &str) -> StorageResult<bool>;
}

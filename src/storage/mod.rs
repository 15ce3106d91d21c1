//! Storage module for persisting run state between crawls
//!
//! This module handles:
//! - Deriving the run id that keys a seed's persisted state
//! - Loading the URL list saved by the previous run
//! - Atomically replacing it with the current run's list

mod json;
mod traits;

pub use json::{JsonRunStateStore, STATE_DIR};
pub use traits::{RunStateStore, StorageError, StorageResult};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Derives the run id for a seed URL
///
/// The id is stable for a given seed and safe to use as a file name.
///
/// # Examples
///
/// ```
/// use web_fetcher::storage::run_id_for;
///
/// assert_eq!(run_id_for("http://x"), "aHR0cDovL3g");
/// ```
pub fn run_id_for(seed_url: &str) -> String {
    URL_SAFE_NO_PAD.encode(seed_url.as_bytes())
}

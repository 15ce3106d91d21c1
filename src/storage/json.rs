//! File-backed run state
//!
//! Each run id owns one JSON file holding an array of URLs. Saves go through a
//! temporary file in the same directory that is then renamed over the old one.

use crate::storage::traits::{RunStateStore, StorageError, StorageResult};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory under the data folder that holds run state files
pub const STATE_DIR: &str = "fetched-data";

/// Run state stored as `<data-folder>/fetched-data/<run-id>.json`
#[derive(Debug, Clone)]
pub struct JsonRunStateStore {
    dir: PathBuf,
}

impl JsonRunStateStore {
    /// Creates a store rooted in `data_folder`
    ///
    /// The directory is created lazily on the first save.
    pub fn new(data_folder: &Path) -> Self {
        Self {
            dir: data_folder.join(STATE_DIR),
        }
    }

    /// Path of the state file for `run_id`
    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", run_id))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl RunStateStore for JsonRunStateStore {
    fn load(&self, run_id: &str) -> StorageResult<Option<Vec<String>>> {
        let path = self.path_for(run_id);

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        let urls = serde_json::from_slice(&content).map_err(|source| StorageError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Some(urls))
    }

    fn save(&self, run_id: &str, urls: &[String]) -> StorageResult<()> {
        let path = self.path_for(run_id);
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let temp = NamedTempFile::new_in(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, urls)?;
            writer.flush().map_err(|e| io_error(temp.path(), e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| io_error(temp.path(), e))?;

        temp.persist(&path).map_err(|e| io_error(&path, e.error))?;

        tracing::debug!(path = %path.display(), urls = urls.len(), "Saved run state");
        Ok(())
    }

    fn clear(&self, run_id: &str) -> StorageResult<bool> {
        let path = self.path_for(run_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

//! File-based checkpoint store — one JSON file per task.
//!
//! Each task's snapshot lives at `<dir>/<task_id>.json`, pretty-printed so
//! a stuck task can be inspected with a pager. Saves overwrite the whole
//! file; the snapshot is small enough that partial-write windows are not
//! worth a journal.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;
use triagent_core::{CheckpointError, CheckpointStore, TaskId, TaskSnapshot};

/// A directory of per-task snapshot files.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`.
    ///
    /// The directory is created on the first save, so construction is
    /// infallible and an unused store leaves no trace on disk.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve a task id to its snapshot file.
    ///
    /// Ids are reduced to `[A-Za-z0-9_-]` so a hostile resume id cannot
    /// escape the directory. Returns `None` when nothing survives.
    fn snapshot_path(&self, task_id: &TaskId) -> Option<PathBuf> {
        let name: String = task_id
            .0
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if name.is_empty() {
            return None;
        }
        Some(self.dir.join(format!("{name}.json")))
    }
}

#[async_trait]
impl CheckpointStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, snapshot: &TaskSnapshot) -> Result<(), CheckpointError> {
        let path = self.snapshot_path(&snapshot.task_id).ok_or_else(|| {
            CheckpointError::Storage(format!(
                "task id {:?} has no filename-safe characters",
                snapshot.task_id.0
            ))
        })?;

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            CheckpointError::Storage(format!("Failed to create checkpoint directory: {e}"))
        })?;

        let body = serde_json::to_string_pretty(snapshot)
            .map_err(|e| CheckpointError::Serialization(format!("snapshot encode: {e}")))?;

        std::fs::write(&path, body)
            .map_err(|e| CheckpointError::Storage(format!("Failed to write snapshot: {e}")))?;

        debug!(task_id = %snapshot.task_id, path = %path.display(), "checkpoint saved");
        Ok(())
    }

    async fn load(&self, task_id: &TaskId) -> Result<Option<TaskSnapshot>, CheckpointError> {
        let Some(path) = self.snapshot_path(task_id) else {
            return Ok(None);
        };

        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CheckpointError::Storage(format!(
                    "Failed to read snapshot: {e}"
                )));
            }
        };

        let snapshot = serde_json::from_str(&body)
            .map_err(|e| CheckpointError::Serialization(format!("snapshot decode: {e}")))?;
        Ok(Some(snapshot))
    }

    async fn delete(&self, task_id: &TaskId) -> Result<(), CheckpointError> {
        let Some(path) = self.snapshot_path(task_id) else {
            return Ok(());
        };

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckpointError::Storage(format!(
                "Failed to delete snapshot: {e}"
            ))),
        }
    }
}

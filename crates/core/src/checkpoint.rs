//! Checkpoint store — durable task snapshots.
//!
//! The governor writes a `TaskSnapshot` through this trait after every tick.
//! A resumed task keeps its fingerprint set and clarification-attempt
//! counter, so restarting the process cannot reset the loop guards.

use async_trait::async_trait;

use crate::error::CheckpointError;
use crate::task::{TaskId, TaskSnapshot};

/// Durable storage for task snapshots.
///
/// Implementations: in-memory, one-file-per-task, sqlite, noop.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// A human-readable name for this backend (e.g., "memory", "sqlite").
    fn name(&self) -> &str;

    /// Persist a snapshot, replacing any previous snapshot for the task.
    async fn save(&self, snapshot: &TaskSnapshot) -> std::result::Result<(), CheckpointError>;

    /// Load the latest snapshot for a task, if one exists.
    async fn load(
        &self,
        task_id: &TaskId,
    ) -> std::result::Result<Option<TaskSnapshot>, CheckpointError>;

    /// Remove a task's snapshot. Removing a missing snapshot is not an error.
    async fn delete(&self, task_id: &TaskId) -> std::result::Result<(), CheckpointError>;
}

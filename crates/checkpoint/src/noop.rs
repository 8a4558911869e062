//! No-op checkpoint store — disables durable snapshots entirely.

use async_trait::async_trait;
use triagent_core::{CheckpointError, CheckpointStore, TaskId, TaskSnapshot};

/// Accepts every save and remembers none of them.
///
/// Tasks still complete normally; they just cannot be resumed.
pub struct NoopStore;

#[async_trait]
impl CheckpointStore for NoopStore {
    fn name(&self) -> &str {
        "noop"
    }

    async fn save(&self, _snapshot: &TaskSnapshot) -> Result<(), CheckpointError> {
        Ok(())
    }

    async fn load(&self, _task_id: &TaskId) -> Result<Option<TaskSnapshot>, CheckpointError> {
        Ok(None)
    }

    async fn delete(&self, _task_id: &TaskId) -> Result<(), CheckpointError> {
        Ok(())
    }
}

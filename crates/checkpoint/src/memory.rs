//! In-memory checkpoint store — useful for tests and one-shot runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use triagent_core::{CheckpointError, CheckpointStore, TaskId, TaskSnapshot};

/// Keeps snapshots in a process-local map. Nothing survives a restart.
pub struct MemoryStore {
    snapshots: Arc<RwLock<HashMap<String, TaskSnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of tasks currently holding a snapshot.
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, snapshot: &TaskSnapshot) -> Result<(), CheckpointError> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.task_id.0.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, task_id: &TaskId) -> Result<Option<TaskSnapshot>, CheckpointError> {
        Ok(self.snapshots.read().await.get(&task_id.0).cloned())
    }

    async fn delete(&self, task_id: &TaskId) -> Result<(), CheckpointError> {
        self.snapshots.write().await.remove(&task_id.0);
        Ok(())
    }
}

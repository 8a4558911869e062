//! SQLite checkpoint store.
//!
//! One row per task in a `task_snapshots` table. The snapshot itself is
//! stored as a JSON blob, so the schema tracks the Rust types rather than
//! a column per field; `state` and `step` are denormalized alongside it so
//! `sqlite3` one-liners can answer "what is stuck where" without parsing
//! JSON.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use triagent_core::{CheckpointError, CheckpointStore, TaskId, TaskSnapshot};

/// A durable checkpoint store backed by a single SQLite database file.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// The table and index are created automatically. Pass
    /// `"sqlite::memory:"` for an in-process ephemeral database (useful
    /// for tests).
    pub async fn new(path: &str) -> Result<Self, CheckpointError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| CheckpointError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite checkpoint store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CheckpointError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_snapshots (
                task_id    TEXT PRIMARY KEY,
                state      TEXT NOT NULL,
                step       INTEGER NOT NULL,
                snapshot   TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::MigrationFailed(format!("task_snapshots table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_task_snapshots_updated_at
             ON task_snapshots(updated_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::MigrationFailed(format!("updated_at index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn save(&self, snapshot: &TaskSnapshot) -> Result<(), CheckpointError> {
        let body = serde_json::to_string(snapshot)
            .map_err(|e| CheckpointError::Serialization(format!("snapshot encode: {e}")))?;
        // GovernorState serializes as a quoted JSON string ("plan"); strip
        // the quotes for the denormalized column.
        let state_json = serde_json::to_string(&snapshot.state)
            .map_err(|e| CheckpointError::Serialization(format!("state encode: {e}")))?;
        let state = state_json.trim_matches('"');

        sqlx::query(
            r#"
            INSERT INTO task_snapshots (task_id, state, step, snapshot, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(task_id) DO UPDATE SET
                state = excluded.state,
                step = excluded.step,
                snapshot = excluded.snapshot,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&snapshot.task_id.0)
        .bind(state)
        .bind(snapshot.step as i64)
        .bind(&body)
        .bind(snapshot.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(format!("INSERT failed: {e}")))?;

        debug!(task_id = %snapshot.task_id, state, "checkpoint saved");
        Ok(())
    }

    async fn load(&self, task_id: &TaskId) -> Result<Option<TaskSnapshot>, CheckpointError> {
        let row = sqlx::query("SELECT snapshot FROM task_snapshots WHERE task_id = ?1")
            .bind(&task_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(format!("SELECT failed: {e}")))?;

        match row {
            Some(row) => {
                let body: String = row
                    .try_get("snapshot")
                    .map_err(|e| CheckpointError::Storage(format!("snapshot column: {e}")))?;
                let snapshot = serde_json::from_str(&body)
                    .map_err(|e| CheckpointError::Serialization(format!("snapshot decode: {e}")))?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, task_id: &TaskId) -> Result<(), CheckpointError> {
        sqlx::query("DELETE FROM task_snapshots WHERE task_id = ?1")
            .bind(&task_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(format!("DELETE failed: {e}")))?;

        Ok(())
    }
}

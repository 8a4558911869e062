//! Checkpoint store implementations for triagent.
//!
//! The governor persists a `TaskSnapshot` after every tick through the
//! `CheckpointStore` trait in `triagent-core`; the backends here decide
//! where those snapshots live. `MemoryStore` for tests and one-shot runs,
//! `FileStore` for inspectable per-task JSON files, `SqliteStore` for the
//! default durable database, `NoopStore` to turn persistence off.

pub mod file;
pub mod memory;
pub mod noop;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use noop::NoopStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

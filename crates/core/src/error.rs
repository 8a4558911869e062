//! Error types for the triagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Note that most operational failures inside the loop (schema mismatches,
//! unavailable capabilities, suppressed duplicates) are *not* surfaced as
//! errors — they become failed Observations and the loop keeps going. The
//! types here cover the cases where a collaborator itself breaks.

use thiserror::Error;

/// The top-level error type for all triagent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Capability errors ---
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Checkpoint errors ---
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Broken task state (malformed snapshot, impossible counters) ---
    #[error("Invariant violation: {0}")]
    Invariant(String),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("Capability not found: {0}")]
    NotFound(String),

    #[error("Capability not allowed for this task: {0}")]
    NotAllowed(String),

    #[error("Invocation failed: {capability} — {reason}")]
    InvocationFailed { capability: String, reason: String },

    #[error("Capability timed out: {capability} after {timeout_secs}s")]
    Timeout { capability: String, timeout_secs: u64 },

    #[error("Invalid capability arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Retrieval backend error: {0}")]
    Backend(String),

    #[error("Retrieval timed out: {0}")]
    Timeout(String),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Snapshot not found for task: {0}")]
    NotFound(String),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

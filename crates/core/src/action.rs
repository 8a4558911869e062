//! Action requests and observations — the working-memory vocabulary.
//!
//! An `ActionRequest` is created by the planner and consumed exactly once by
//! the executor (or suppressed as a duplicate). Every execution attempt —
//! successful, failed, suppressed, or rejected before invocation — produces
//! exactly one `Observation`. Observations are immutable once created and
//! are appended to the task's working memory in insertion order, which is
//! never reordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A requested invocation of an external capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Unique request ID
    pub id: String,

    /// Name of the capability to invoke
    pub name: String,

    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

impl ActionRequest {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }
}

/// The recorded outcome of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// ID of the request this observation answers
    pub request_id: String,

    /// Name of the capability that was (or would have been) invoked
    pub action_name: String,

    /// Whether the invocation succeeded
    pub success: bool,

    /// Structured payload returned by the capability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    /// Error string for failed attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Bounded human-readable summary for prompt assembly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// When the attempt was recorded
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Record a successful invocation.
    pub fn success(
        request: &ActionRequest,
        payload: serde_json::Value,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request.id.clone(),
            action_name: request.name.clone(),
            success: true,
            payload: Some(payload),
            error: None,
            summary: Some(summary.into()),
            timestamp: Utc::now(),
        }
    }

    /// Record a failed attempt (including pre-invocation rejections).
    pub fn failure(request: &ActionRequest, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            request_id: request.id.clone(),
            action_name: request.name.clone(),
            success: false,
            payload: None,
            error: Some(error.clone()),
            summary: Some(error),
            timestamp: Utc::now(),
        }
    }

    /// One-line rendering for prompts and logs.
    pub fn render(&self) -> String {
        let status = if self.success { "ok" } else { "failed" };
        let detail = self
            .summary
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("");
        format!("[{status}] {}: {detail}", self.action_name)
    }
}

//! REST API v1 — the task surface of the pipeline.
//!
//! Endpoints:
//!
//! - `POST /v1/tasks`          — Submit a task, run it to completion
//! - `GET  /v1/tasks/{id}`     — Read back a task's checkpointed state
//! - `GET  /v1/capabilities`   — List the registered capabilities
//! - `GET  /v1/status`         — Service status and wiring overview

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use tracing::{error, info};

use triagent_core::{
    CapabilitySpec, Diagnostics, GovernorState, OutputKind, TaskId, TaskInput, TaskSnapshot,
};
use triagent_governor::CancelHandle;

use crate::SharedState;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/tasks", post(create_task_handler))
        .route("/tasks/{id}", get(get_task_handler))
        .route("/capabilities", get(list_capabilities_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

// ── Response types ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TaskResponse {
    task_id: String,
    kind: OutputKind,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    diagnostics: Diagnostics,
}

#[derive(Serialize)]
struct TaskDetailResponse {
    task_id: String,
    query: String,
    state: GovernorState,
    step: u32,
    step_budget: u32,
    evidence: String,
    observations: usize,
    duplicate_calls: u32,
    clarification_attempts: u32,
    exhausted_budget: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TaskDetailResponse {
    fn from_snapshot(snapshot: &TaskSnapshot) -> Self {
        Self {
            task_id: snapshot.task_id.to_string(),
            query: snapshot.query.clone(),
            state: snapshot.state,
            step: snapshot.step,
            step_budget: snapshot.step_budget,
            evidence: snapshot.evidence.clone(),
            observations: snapshot.observations.len(),
            duplicate_calls: snapshot.duplicate_calls,
            clarification_attempts: snapshot.clarification_attempts,
            exhausted_budget: snapshot.exhausted_budget,
            last_error: snapshot.last_error.clone(),
            created_at: snapshot.created_at.to_rfc3339(),
            updated_at: snapshot.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct CapabilityListResponse {
    capabilities: Vec<CapabilitySpec>,
    count: usize,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    provider: String,
    capabilities: usize,
    checkpoint_backend: String,
    uptime_secs: i64,
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// Run one task through the pipeline and return its terminal output.
///
/// The gateway assigns the task id up front so the caller can poll
/// `GET /v1/tasks/{id}` afterwards; a client-supplied `task_id` resumes
/// that task instead.
async fn create_task_handler(
    State(state): State<SharedState>,
    Json(mut input): Json<TaskInput>,
) -> Json<TaskResponse> {
    let task_id = input.task_id.clone().unwrap_or_default();
    input.task_id = Some(task_id.clone());

    info!(%task_id, query_len = input.query.len(), "task submitted");
    let output = state.runner.run(input, &CancelHandle::new()).await;

    Json(TaskResponse {
        task_id: task_id.to_string(),
        kind: output.kind,
        text: output.text,
        confidence: output.confidence,
        diagnostics: output.diagnostics,
    })
}

async fn get_task_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<TaskDetailResponse>, StatusCode> {
    match state.checkpoints.load(&TaskId::from(&id)).await {
        Ok(Some(snapshot)) => Ok(Json(TaskDetailResponse::from_snapshot(&snapshot))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(task_id = %id, error = %e, "snapshot load failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn list_capabilities_handler(
    State(state): State<SharedState>,
) -> Json<CapabilityListResponse> {
    // registry order is a HashMap's; sort for a stable response
    let mut capabilities = state.registry.specs();
    capabilities.sort_by(|a, b| a.name.cmp(&b.name));
    let count = capabilities.len();
    Json(CapabilityListResponse {
        capabilities,
        count,
    })
}

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().into(),
        capabilities: state.registry.len(),
        checkpoint_backend: state.checkpoints.name().into(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────

//! Task domain types — the unit of work flowing through the system.
//!
//! One `Task` is one user query under processing: the query text, the step
//! budget, accumulated evidence, and the counters the loop guards read. The
//! serializable form is `TaskSnapshot`, persisted through a `CheckpointStore`
//! after every governor tick and sufficient to resume after a crash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::action::Observation;
use crate::plan::Plan;

/// Default number of plan/execute/reflect cycles before forced termination.
pub const DEFAULT_STEP_BUDGET: u32 = 6;

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The governor's routing states.
///
/// `Plan`, `Execute`, and `Reflect` are working states; `Answer`, `Clarify`,
/// and `Stop` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernorState {
    Plan,
    Execute,
    Reflect,
    Answer,
    Clarify,
    Stop,
}

impl GovernorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GovernorState::Answer | GovernorState::Clarify | GovernorState::Stop
        )
    }
}

/// The invocation contract's input side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInput {
    /// The user's query
    pub query: String,

    /// Plan-cycle budget; zero is treated as the default
    #[serde(default = "default_step_budget")]
    pub step_budget: u32,

    /// If set, only these capabilities may be invoked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_actions: Option<Vec<String>>,

    /// Resume an existing task (keeps its fingerprints and attempt counter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

fn default_step_budget() -> u32 {
    DEFAULT_STEP_BUDGET
}

impl TaskInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            step_budget: DEFAULT_STEP_BUDGET,
            allowed_actions: None,
            task_id: None,
        }
    }

    pub fn with_budget(mut self, step_budget: u32) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn with_allowed_actions(mut self, actions: Vec<String>) -> Self {
        self.allowed_actions = Some(actions);
        self
    }

    /// The budget actually enforced; a zero budget falls back to the default.
    pub fn effective_budget(&self) -> u32 {
        if self.step_budget == 0 {
            DEFAULT_STEP_BUDGET
        } else {
            self.step_budget
        }
    }
}

/// What kind of terminal output a task produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Answer,
    Clarification,
    Escalation,
}

/// The diagnostic trail attached to every output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Plan cycles consumed
    pub iterations: u32,

    /// Invocations suppressed as duplicates
    pub duplicate_calls: u32,

    /// Whether the step budget forced termination
    pub exhausted_budget: bool,

    /// Most recent failure observed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// Advisory quality report for answer-kind outputs, when validation ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<serde_json::Value>,
}

/// The invocation contract's output side. Always one of answer,
/// clarification, or escalation — never a raw error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub kind: OutputKind,

    /// Answer text, clarifying question, or escalation notice
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    pub diagnostics: Diagnostics,
}

/// Serializable state of a task, written after every governor tick.
///
/// Fingerprints are kept in a `BTreeSet` so snapshots serialize in a stable
/// order. The observation log is append-only; the snapshot carries it whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub query: String,
    pub state: GovernorState,

    pub step: u32,
    pub step_budget: u32,

    /// Accumulated free-text synthesis of everything learned so far
    pub evidence: String,

    /// Canonical hashes of every successful invocation; never shrinks
    pub seen_fingerprints: BTreeSet<String>,

    /// Append-only working memory
    pub observations: Vec<Observation>,

    /// The most recently adopted plan, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_plan: Option<Plan>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_actions: Option<Vec<String>>,

    pub clarification_attempts: u32,
    pub consecutive_plan_routes: u32,
    pub duplicate_calls: u32,
    pub exhausted_budget: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskSnapshot {
    /// Sanity checks applied before resuming from a persisted snapshot.
    /// A snapshot that fails these forces a fresh task instead of a resume.
    pub fn is_resumable(&self) -> bool {
        self.step <= self.step_budget
            && self.step_budget > 0
            && !self.query.is_empty()
    }
}

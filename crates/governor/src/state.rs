//! Runtime task state and cooperative cancellation.
//!
//! `TaskState` is the in-flight form of a task: everything `TaskSnapshot`
//! persists plus the ephemeral pending-action queue. Conversion in both
//! directions is lossless except for that queue, which is rebuilt from the
//! current plan on resume — duplicate suppression makes re-enqueueing an
//! already-executed action harmless.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use triagent_core::{
    ActionRequest, GovernorState, Observation, Plan, ReflectionDecision, ReflectionOutcome,
    TaskId, TaskInput, TaskSnapshot, clamp_unit,
};

/// Cooperative cancellation flag, shared between the governor and whoever
/// owns the task. Checked at tick boundaries only; a cancelled task finishes
/// its current stage and then terminates as if the budget were exhausted.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The live state of one task working through the loop.
pub struct TaskState {
    pub task_id: TaskId,
    pub query: String,
    pub state: GovernorState,

    pub step: u32,
    pub step_budget: u32,

    pub evidence: String,
    pub seen_fingerprints: BTreeSet<String>,
    pub observations: Vec<Observation>,

    /// Actions planned but not yet executed, in submission order
    pub pending: VecDeque<ActionRequest>,

    pub current_plan: Option<Plan>,
    pub allowed_actions: Option<Vec<String>>,

    pub clarification_attempts: u32,
    pub consecutive_plan_routes: u32,
    pub duplicate_calls: u32,
    pub exhausted_budget: bool,
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskState {
    /// Fresh state for a new task.
    pub fn new(input: &TaskInput) -> Self {
        let now = Utc::now();
        Self {
            task_id: input.task_id.clone().unwrap_or_default(),
            query: input.query.clone(),
            state: GovernorState::Plan,
            step: 0,
            step_budget: input.effective_budget(),
            evidence: String::new(),
            seen_fingerprints: BTreeSet::new(),
            observations: Vec::new(),
            pending: VecDeque::new(),
            current_plan: None,
            allowed_actions: input.allowed_actions.clone(),
            clarification_attempts: 0,
            consecutive_plan_routes: 0,
            duplicate_calls: 0,
            exhausted_budget: false,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate from a persisted snapshot. An unexecuted `Action` plan is
    /// re-enqueued; if it already ran to success before the crash, the
    /// deduplicator suppresses the replay.
    pub fn from_snapshot(snapshot: TaskSnapshot) -> Self {
        let mut pending = VecDeque::new();
        if let Some(Plan::Action { name, arguments, .. }) = &snapshot.current_plan {
            pending.push_back(ActionRequest::new(name.clone(), arguments.clone()));
        }
        Self {
            task_id: snapshot.task_id,
            query: snapshot.query,
            state: snapshot.state,
            step: snapshot.step,
            step_budget: snapshot.step_budget,
            evidence: snapshot.evidence,
            seen_fingerprints: snapshot.seen_fingerprints,
            observations: snapshot.observations,
            pending,
            current_plan: snapshot.current_plan,
            allowed_actions: snapshot.allowed_actions,
            clarification_attempts: snapshot.clarification_attempts,
            consecutive_plan_routes: snapshot.consecutive_plan_routes,
            duplicate_calls: snapshot.duplicate_calls,
            exhausted_budget: snapshot.exhausted_budget,
            last_error: snapshot.last_error,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }

    /// The persistable view of this state.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.task_id.clone(),
            query: self.query.clone(),
            state: self.state,
            step: self.step,
            step_budget: self.step_budget,
            evidence: self.evidence.clone(),
            seen_fingerprints: self.seen_fingerprints.clone(),
            observations: self.observations.clone(),
            current_plan: self.current_plan.clone(),
            allowed_actions: self.allowed_actions.clone(),
            clarification_attempts: self.clarification_attempts,
            consecutive_plan_routes: self.consecutive_plan_routes,
            duplicate_calls: self.duplicate_calls,
            exhausted_budget: self.exhausted_budget,
            last_error: self.last_error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn remaining_steps(&self) -> u32 {
        self.step_budget.saturating_sub(self.step)
    }

    pub fn failed_count(&self) -> usize {
        self.observations.iter().filter(|o| !o.success).count()
    }

    pub fn success_count(&self) -> usize {
        self.observations.iter().filter(|o| o.success).count()
    }

    pub fn last_observation(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Append an observation, tracking the most recent failure.
    pub fn record_observation(&mut self, observation: Observation) {
        if !observation.success {
            self.last_error = observation
                .error
                .clone()
                .or_else(|| observation.summary.clone());
        }
        self.observations.push(observation);
    }

    /// Adopt a freshly planned move. An `Action` plan also queues its
    /// request for the executor.
    pub fn adopt_plan(&mut self, plan: Plan) {
        if let Plan::Action {
            name, arguments, ..
        } = &plan
        {
            self.pending
                .push_back(ActionRequest::new(name.clone(), arguments.clone()));
        }
        self.current_plan = Some(plan);
    }

    /// Apply a reflection decision. Evidence is replaced only when the
    /// decision carries a non-empty update; it is never cleared back to
    /// empty. `Continue` discards the current plan so the next tick plans
    /// fresh.
    pub fn absorb_reflection(&mut self, decision: &ReflectionDecision) {
        if !decision.updated_evidence.is_empty() {
            self.evidence = decision.updated_evidence.clone();
        }
        match decision.outcome {
            ReflectionOutcome::Continue => {
                self.current_plan = None;
            }
            ReflectionOutcome::Answer => {
                self.current_plan = Some(Plan::Answer {
                    content: self.evidence.clone(),
                    confidence: clamp_unit(decision.confidence),
                    rationale: decision.rationale.clone(),
                });
            }
            ReflectionOutcome::Clarify => {
                self.current_plan = Some(Plan::Clarify {
                    question: String::new(),
                    rationale: decision.rationale.clone(),
                });
            }
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> TaskState {
        TaskState::new(&TaskInput::new("how do I configure oauth2?"))
    }

    #[test]
    fn cancel_handle_is_shared() {
        let handle = CancelHandle::new();
        let other = handle.clone();
        assert!(!other.is_cancelled());
        handle.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn adopting_an_action_plan_queues_a_request() {
        let mut state = state();
        state.adopt_plan(Plan::Action {
            name: "knowledge_search".into(),
            arguments: json!({"query": "oauth2"}),
            rationale: "need docs".into(),
        });
        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.pending[0].name, "knowledge_search");
        assert!(matches!(state.current_plan, Some(Plan::Action { .. })));
    }

    #[test]
    fn reflection_continue_discards_the_plan() {
        let mut state = state();
        state.adopt_plan(Plan::Answer {
            content: "done".into(),
            confidence: 0.8,
            rationale: String::new(),
        });
        state.absorb_reflection(&ReflectionDecision {
            outcome: ReflectionOutcome::Continue,
            updated_evidence: "redirect URIs must match exactly".into(),
            confidence: 0.5,
            rationale: String::new(),
        });
        assert!(state.current_plan.is_none());
        assert_eq!(state.evidence, "redirect URIs must match exactly");
    }

    #[test]
    fn empty_evidence_update_is_ignored() {
        let mut state = state();
        state.evidence = "existing".into();
        state.absorb_reflection(&ReflectionDecision {
            outcome: ReflectionOutcome::Answer,
            updated_evidence: String::new(),
            confidence: 0.9,
            rationale: "enough".into(),
        });
        assert_eq!(state.evidence, "existing");
        match &state.current_plan {
            Some(Plan::Answer {
                content, confidence, ..
            }) => {
                assert_eq!(content, "existing");
                assert!((confidence - 0.9).abs() < 1e-6);
            }
            other => panic!("expected answer plan, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_roundtrip_rebuilds_pending_from_action_plan() {
        let mut state = state();
        state.adopt_plan(Plan::Action {
            name: "ticket_lookup".into(),
            arguments: json!({"ticket_id": "T-100"}),
            rationale: String::new(),
        });
        state.step = 2;
        let restored = TaskState::from_snapshot(state.snapshot());
        assert_eq!(restored.step, 2);
        assert_eq!(restored.pending.len(), 1);
        assert_eq!(restored.pending[0].name, "ticket_lookup");
    }

    #[test]
    fn record_observation_tracks_last_error() {
        let mut state = state();
        let request = ActionRequest::new("service_status", json!({}));
        state.record_observation(Observation::failure(&request, "status page timed out"));
        assert_eq!(state.last_error.as_deref(), Some("status page timed out"));
        assert_eq!(state.failed_count(), 1);
        assert_eq!(state.success_count(), 0);
    }
}

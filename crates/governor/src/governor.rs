//! Loop governor — the state machine that bounds the agent.
//!
//! Every tick routes the task through an ordered set of guards before any
//! model call is made: budget first, then repetition, then aggregate
//! failure, then pending work, then the current plan. The guards are pure
//! functions of per-task state, so two tasks running side by side can never
//! trip each other's limits.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use triagent_core::{
    CapabilityRegistry, CapabilitySpec, CheckpointStore, DecisionParams, GovernorState,
    Observation, Plan, Provider,
};

use crate::executor::Executor;
use crate::planner::Planner;
use crate::reflect::Reflector;
use crate::state::{CancelHandle, TaskState};

/// Observations inspected by the repetition guard.
pub const REPETITION_WINDOW: usize = 5;
/// Consecutive same-action failures that force an answer.
pub const REPETITION_RUN: usize = 3;
/// Failures within the window that force an answer, regardless of action.
pub const WINDOW_FAILURE_LIMIT: usize = 3;
/// Total failures at which the aggregate guard engages.
pub const AGGREGATE_FAILURE_LIMIT: usize = 4;
/// Evidence length that counts as useful signal for the aggregate guard.
pub const MIN_SIGNAL_EVIDENCE_CHARS: usize = 50;

/// What routing does when every attempt has failed and nothing was learned:
/// at least [`AGGREGATE_FAILURE_LIMIT`] failures, zero successes, and less
/// than [`MIN_SIGNAL_EVIDENCE_CHARS`] of evidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PureFailurePolicy {
    /// Fall through to normal routing; a later guard or the budget ends
    /// the task.
    #[default]
    Continue,
    /// Ask the user for help immediately.
    Clarify,
    /// Answer with whatever thin evidence exists.
    Answer,
}

impl std::str::FromStr for PureFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "clarify" => Ok(Self::Clarify),
            "answer" => Ok(Self::Answer),
            other => Err(format!("unknown pure-failure policy: {other:?}")),
        }
    }
}

/// Route one governor tick.
///
/// Never returns `Reflect` — that state is entered only from `Execute`.
/// Mutates `state` for two bookkeeping effects: the exhausted-budget flag
/// and the consecutive-plan counter.
pub fn route(
    state: &mut TaskState,
    capabilities_available: bool,
    cancelled: bool,
    policy: PureFailurePolicy,
) -> GovernorState {
    // 1. budget guard; cancellation behaves exactly like exhaustion
    if cancelled || state.step >= state.step_budget {
        state.exhausted_budget = true;
        return GovernorState::Answer;
    }

    // 2. repetition guard over the trailing observation window
    if repetition_detected(&state.observations) {
        info!(task_id = %state.task_id, "repetition guard tripped, forcing answer");
        return GovernorState::Answer;
    }

    // 3. aggregate-failure guard
    if let Some(forced) = aggregate_failure_verdict(
        state.failed_count(),
        state.success_count(),
        state.evidence.chars().count(),
        policy,
    ) {
        info!(task_id = %state.task_id, next = ?forced, "aggregate-failure guard tripped");
        return forced;
    }

    // 4. queued work runs before anything new is planned
    if !state.pending.is_empty() {
        state.consecutive_plan_routes = 0;
        return GovernorState::Execute;
    }

    // 5. nothing to act with
    if !capabilities_available {
        return GovernorState::Answer;
    }

    // 6. honor the most recent plan
    match &state.current_plan {
        Some(Plan::Answer { .. }) => return GovernorState::Answer,
        Some(Plan::Clarify { .. }) => return GovernorState::Clarify,
        Some(Plan::Action { .. }) => {
            state.consecutive_plan_routes = 0;
            return GovernorState::Execute;
        }
        None => {}
    }

    // 7. plan again, but not forever: a planner that keeps declining to
    //    act or conclude gets answered out once the counter spends the
    //    whole budget
    if state.consecutive_plan_routes >= state.step_budget {
        state.consecutive_plan_routes = 0;
        return GovernorState::Answer;
    }
    state.consecutive_plan_routes += 1;
    GovernorState::Plan
}

/// Whether the trailing window shows unproductive repetition: the last
/// [`REPETITION_RUN`] observations failed on the same action, or at least
/// [`WINDOW_FAILURE_LIMIT`] of the last [`REPETITION_WINDOW`] failed.
pub(crate) fn repetition_detected(observations: &[Observation]) -> bool {
    let window: Vec<&Observation> = observations.iter().rev().take(REPETITION_WINDOW).collect();

    if window.len() >= REPETITION_RUN {
        let run = &window[..REPETITION_RUN];
        let name = &run[0].action_name;
        if run.iter().all(|o| !o.success && o.action_name == *name) {
            return true;
        }
    }

    window.iter().filter(|o| !o.success).count() >= WINDOW_FAILURE_LIMIT
}

/// Verdict of the aggregate-failure guard, or `None` to keep routing.
///
/// Forces an answer once failures pile up next to real signal (long enough
/// evidence, or one success). The pure-failure branch is a policy hook: with
/// zero successes every recent observation is a failure, so in the routing
/// order above the window guard fires first and `Continue` is what actually
/// plays out.
pub(crate) fn aggregate_failure_verdict(
    failures: usize,
    successes: usize,
    evidence_chars: usize,
    policy: PureFailurePolicy,
) -> Option<GovernorState> {
    if failures < AGGREGATE_FAILURE_LIMIT {
        return None;
    }
    if evidence_chars >= MIN_SIGNAL_EVIDENCE_CHARS || successes > 0 {
        return Some(GovernorState::Answer);
    }
    match policy {
        PureFailurePolicy::Continue => None,
        PureFailurePolicy::Clarify => Some(GovernorState::Clarify),
        PureFailurePolicy::Answer => Some(GovernorState::Answer),
    }
}

/// Drives tasks through plan → execute → reflect until a terminal state.
pub struct Governor {
    planner: Planner,
    reflector: Reflector,
    executor: Executor,
    registry: Arc<CapabilityRegistry>,
    checkpoints: Arc<dyn CheckpointStore>,
    policy: PureFailurePolicy,
}

impl Governor {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<CapabilityRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            planner: Planner::new(provider.clone()),
            reflector: Reflector::new(provider),
            executor: Executor::new(registry.clone()),
            registry,
            checkpoints,
            policy: PureFailurePolicy::default(),
        }
    }

    pub fn with_pure_failure_policy(mut self, policy: PureFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply one set of sampling parameters to both decision stages.
    pub fn with_decision_params(mut self, params: DecisionParams) -> Self {
        self.planner = self.planner.with_params(params);
        self.reflector = self.reflector.with_params(params);
        self
    }

    /// Run the loop until the task reaches a terminal state. A snapshot is
    /// written after every routing decision and after every stage's work,
    /// so a crash loses at most the stage in flight.
    pub async fn run(&self, state: &mut TaskState, cancel: &CancelHandle) {
        loop {
            let next = route(
                state,
                self.capabilities_available(state),
                cancel.is_cancelled(),
                self.policy,
            );
            state.state = next;
            state.touch();
            self.checkpoint(state).await;

            match next {
                GovernorState::Plan => {
                    state.step += 1;
                    let specs = self.allowed_specs(state);
                    let plan = self.planner.plan(state, &specs).await;
                    debug!(task_id = %state.task_id, step = state.step, plan = ?plan, "plan adopted");
                    state.adopt_plan(plan);
                }
                GovernorState::Execute => {
                    self.executor.run_pending(state).await;
                    state.state = GovernorState::Reflect;
                    state.touch();
                    self.checkpoint(state).await;
                    let decision = self.reflector.reflect(state).await;
                    debug!(
                        task_id = %state.task_id,
                        outcome = ?decision.outcome,
                        confidence = decision.confidence,
                        "reflection absorbed"
                    );
                    state.absorb_reflection(&decision);
                }
                // route() never yields Reflect; it is entered above, from
                // Execute, and the terminal states end the loop
                GovernorState::Reflect
                | GovernorState::Answer
                | GovernorState::Clarify
                | GovernorState::Stop => break,
            }

            state.touch();
            self.checkpoint(state).await;
        }
    }

    /// Whether any capability the task may use is actually registered.
    fn capabilities_available(&self, state: &TaskState) -> bool {
        match &state.allowed_actions {
            Some(allowed) => allowed.iter().any(|name| self.registry.get(name).is_some()),
            None => !self.registry.is_empty(),
        }
    }

    /// Capability specs the planner is allowed to see.
    fn allowed_specs(&self, state: &TaskState) -> Vec<CapabilitySpec> {
        self.registry
            .specs()
            .into_iter()
            .filter(|spec| {
                state
                    .allowed_actions
                    .as_ref()
                    .map(|allowed| allowed.contains(&spec.name))
                    .unwrap_or(true)
            })
            .collect()
    }

    async fn checkpoint(&self, state: &TaskState) {
        if let Err(e) = self.checkpoints.save(&state.snapshot()).await {
            warn!(task_id = %state.task_id, error = %e, "checkpoint save failed");
        }
    }
}

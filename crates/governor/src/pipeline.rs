//! Task runner — the outer pipeline around the governor.
//!
//! Owns the pieces the loop itself does not: resuming from a checkpoint,
//! turning the terminal loop state into a caller-facing output, the
//! confidence-routed answer/clarify/escalate split, and the advisory quality
//! check. Whatever happens inside, the caller always receives exactly one of
//! answer, clarification, or escalation — never a raw error.

use std::sync::Arc;
use tracing::{info, warn};
use triagent_core::{
    CapabilityRegistry, CheckpointStore, DecisionParams, Diagnostics, GovernorState, OutputKind,
    Plan, Provider, TaskInput, TaskOutput,
};
use triagent_quality::QualityValidator;

use crate::governor::{Governor, PureFailurePolicy};
use crate::planner::FALLBACK_CONFIDENCE;
use crate::router::{ConfidenceRouter, Route};
use crate::state::{CancelHandle, TaskState};

pub struct TaskRunner {
    governor: Governor,
    checkpoints: Arc<dyn CheckpointStore>,
    router: ConfidenceRouter,
    validator: Option<QualityValidator>,
}

impl TaskRunner {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<CapabilityRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            governor: Governor::new(provider, registry, checkpoints.clone()),
            checkpoints,
            router: ConfidenceRouter::default(),
            validator: Some(QualityValidator::new()),
        }
    }

    pub fn with_router(mut self, router: ConfidenceRouter) -> Self {
        self.router = router;
        self
    }

    pub fn with_pure_failure_policy(mut self, policy: PureFailurePolicy) -> Self {
        self.governor = self.governor.with_pure_failure_policy(policy);
        self
    }

    pub fn with_decision_params(mut self, params: DecisionParams) -> Self {
        self.governor = self.governor.with_decision_params(params);
        self
    }

    pub fn with_validator(mut self, validator: QualityValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Skip the advisory quality check; `diagnostics.quality` stays empty.
    pub fn without_quality_gate(mut self) -> Self {
        self.validator = None;
        self
    }

    /// Run one task to completion and produce its output.
    pub async fn run(&self, input: TaskInput, cancel: &CancelHandle) -> TaskOutput {
        if input.query.trim().is_empty() {
            return TaskOutput {
                kind: OutputKind::Clarification,
                text: "What would you like help with? The request came through empty.".into(),
                confidence: None,
                diagnostics: Diagnostics::default(),
            };
        }

        let mut state = self.initial_state(&input).await;
        self.governor.run(&mut state, cancel).await;

        let output = self.finalize(&mut state);
        state.state = GovernorState::Stop;
        state.touch();
        if let Err(e) = self.checkpoints.save(&state.snapshot()).await {
            warn!(task_id = %state.task_id, error = %e, "final checkpoint save failed");
        }
        info!(
            task_id = %state.task_id,
            kind = ?output.kind,
            iterations = output.diagnostics.iterations,
            exhausted = output.diagnostics.exhausted_budget,
            "task finished"
        );
        output
    }

    /// Resume from a usable snapshot when the input names a known task;
    /// otherwise start fresh under the same id.
    async fn initial_state(&self, input: &TaskInput) -> TaskState {
        if let Some(task_id) = &input.task_id {
            match self.checkpoints.load(task_id).await {
                Ok(Some(snapshot)) if snapshot.is_resumable() => {
                    info!(%task_id, step = snapshot.step, "resuming from checkpoint");
                    return TaskState::from_snapshot(snapshot);
                }
                Ok(Some(_)) => {
                    warn!(%task_id, "snapshot not resumable, starting fresh");
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(%task_id, error = %e, "checkpoint load failed, starting fresh");
                }
            }
        }
        TaskState::new(input)
    }

    /// Turn a terminal loop state into the caller-facing output.
    fn finalize(&self, state: &mut TaskState) -> TaskOutput {
        let mut diagnostics = Diagnostics {
            iterations: state.step,
            duplicate_calls: state.duplicate_calls,
            exhausted_budget: state.exhausted_budget,
            last_error: state.last_error.clone(),
            quality: None,
        };

        if state.state == GovernorState::Clarify {
            if state.clarification_attempts >= self.router.max_attempts() {
                return TaskOutput {
                    kind: OutputKind::Escalation,
                    text: escalation_text(),
                    confidence: None,
                    diagnostics,
                };
            }
            state.clarification_attempts += 1;
            let question = match &state.current_plan {
                Some(Plan::Clarify { question, .. }) if !question.is_empty() => question.clone(),
                _ => compose_clarification(&state.query),
            };
            return TaskOutput {
                kind: OutputKind::Clarification,
                text: question,
                confidence: None,
                diagnostics,
            };
        }

        // everything else resolves as an answer attempt, then gets routed
        let (content, confidence) = match &state.current_plan {
            Some(Plan::Answer {
                content, confidence, ..
            }) if !content.is_empty() => (content.clone(), *confidence),
            _ => fallback_answer(state),
        };

        match self.router.route(confidence, state.clarification_attempts) {
            Route::Respond => {
                if let Some(validator) = &self.validator {
                    let sources: Vec<String> = state
                        .observations
                        .iter()
                        .filter(|o| o.success)
                        .filter_map(|o| o.summary.clone())
                        .collect();
                    let report = validator.validate(&state.query, &content, &sources);
                    diagnostics.quality = serde_json::to_value(&report).ok();
                }
                TaskOutput {
                    kind: OutputKind::Answer,
                    text: content,
                    confidence: Some(confidence),
                    diagnostics,
                }
            }
            Route::Clarify => {
                state.clarification_attempts += 1;
                TaskOutput {
                    kind: OutputKind::Clarification,
                    text: compose_clarification(&state.query),
                    confidence: Some(confidence),
                    diagnostics,
                }
            }
            Route::Escalate => TaskOutput {
                kind: OutputKind::Escalation,
                text: escalation_text(),
                confidence: Some(confidence),
                diagnostics,
            },
        }
    }
}

fn compose_clarification(query: &str) -> String {
    format!(
        "I want to make sure I get this right. Could you share more detail \
         about what you need for: \"{query}\"?"
    )
}

fn escalation_text() -> String {
    "I couldn't resolve this confidently, so I'm handing it to a human agent \
     along with everything gathered so far."
        .into()
}

/// Worst-case answer: whatever evidence exists, at low confidence.
fn fallback_answer(state: &TaskState) -> (String, f32) {
    let content = if state.evidence.is_empty() {
        "I wasn't able to gather enough reliable information to answer this.".to_string()
    } else {
        state.evidence.clone()
    };
    (content, FALLBACK_CONFIDENCE)
}

//! Reflection stage — judge progress after each execution round.
//!
//! The model re-reads the evidence, the observation that just landed, and
//! the remaining budget, then picks one of three outcomes: keep working,
//! answer now, or ask the user. Its `updated_evidence` replaces the task
//! evidence wholesale when non-empty. A failed call or unparseable output
//! degrades to answer-now at low confidence so the loop terminates instead
//! of spinning on a broken model.

use std::sync::Arc;
use tracing::warn;
use triagent_core::{
    DecisionParams, DecisionRequest, Provider, ReflectionDecision, ReflectionOutcome, clamp_unit,
    extract_json_object,
};

use crate::planner::FALLBACK_CONFIDENCE;
use crate::state::TaskState;

/// Observations shown to the model when reflecting, latest included.
const REFLECT_WINDOW: usize = 5;

pub struct Reflector {
    provider: Arc<dyn Provider>,
    params: DecisionParams,
}

impl Reflector {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            params: DecisionParams::default(),
        }
    }

    pub fn with_params(mut self, params: DecisionParams) -> Self {
        self.params = params;
        self
    }

    /// Judge the task after an execution round. Infallible by design: model
    /// trouble yields an answer-now decision built from existing evidence.
    pub async fn reflect(&self, state: &TaskState) -> ReflectionDecision {
        let request = DecisionRequest::new(system_prompt(), situation_prompt(state))
            .with_params(self.params);
        match self.provider.decide(request).await {
            Ok(response) => match parse_reflection(&response.content) {
                Some(decision) => decision,
                None => {
                    warn!(task_id = %state.task_id, "unparseable reflection output, falling back");
                    fallback_reflection()
                }
            },
            Err(e) => {
                warn!(task_id = %state.task_id, error = %e, "reflection call failed, falling back");
                fallback_reflection()
            }
        }
    }
}

/// Extract and validate a reflection decision from raw model text.
pub(crate) fn parse_reflection(content: &str) -> Option<ReflectionDecision> {
    let json = extract_json_object(content)?;
    let mut decision: ReflectionDecision = serde_json::from_str(&json).ok()?;
    decision.confidence = clamp_unit(decision.confidence);
    Some(decision)
}

pub(crate) fn fallback_reflection() -> ReflectionDecision {
    ReflectionDecision {
        outcome: ReflectionOutcome::Answer,
        updated_evidence: String::new(),
        confidence: FALLBACK_CONFIDENCE,
        rationale: "reflection call failed; answering with gathered evidence".into(),
    }
}

fn system_prompt() -> String {
    "You are the reflection stage of a support triage agent. An action just \
     ran; judge whether the task can be answered yet.\n\n\
     Respond with exactly one JSON object, no prose:\n\
     {\"outcome\": \"continue\" | \"answer\" | \"clarify\", \
     \"updated_evidence\": \"...\", \"confidence\": 0.0, \"rationale\": \"...\"}\n\n\
     Rules: updated_evidence replaces the stored evidence wholesale, so carry \
     forward every fact still worth keeping. Choose \"answer\" once the \
     evidence covers the query, \"clarify\" only when no capability can \
     resolve the ambiguity, \"continue\" otherwise."
        .into()
}

fn situation_prompt(state: &TaskState) -> String {
    let evidence = if state.evidence.is_empty() {
        "(none yet)"
    } else {
        state.evidence.as_str()
    };

    let latest = state
        .last_observation()
        .map(|observation| observation.render())
        .unwrap_or_else(|| "(none)".into());

    let mut earlier = String::new();
    let shown = state
        .observations
        .iter()
        .rev()
        .skip(1)
        .take(REFLECT_WINDOW - 1)
        .collect::<Vec<_>>();
    for observation in shown.iter().rev() {
        earlier.push_str(&format!("- {}\n", observation.render()));
    }
    if earlier.is_empty() {
        earlier.push_str("(none)\n");
    }

    format!(
        "User query: {}\n\
         Steps remaining: {} of {}.\n\n\
         Evidence so far:\n{evidence}\n\n\
         Latest observation:\n{latest}\n\n\
         Earlier observations:\n{earlier}\n\
         Judge the state of the task.",
        state.query,
        state.remaining_steps(),
        state.step_budget,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{OfflineProvider, ScriptedDecider, reflection_json};
    use triagent_core::{ActionRequest, Observation, TaskInput};

    fn state() -> TaskState {
        TaskState::new(&TaskInput::new("Why are webhook deliveries failing?"))
    }

    fn observation(name: &str, success: bool, summary: &str) -> Observation {
        let request = ActionRequest::new(name, serde_json::json!({}));
        if success {
            Observation::success(&request, serde_json::json!({}), summary)
        } else {
            Observation::failure(&request, summary)
        }
    }

    #[tokio::test]
    async fn parses_a_continue_decision() {
        let provider = Arc::new(ScriptedDecider::new(vec![&reflection_json(
            "continue",
            "retries use exponential backoff",
            0.6,
        )]));
        let decision = Reflector::new(provider).reflect(&state()).await;
        assert_eq!(decision.outcome, ReflectionOutcome::Continue);
        assert_eq!(decision.updated_evidence, "retries use exponential backoff");
        assert!((decision.confidence - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_answer_now() {
        let decision = Reflector::new(Arc::new(OfflineProvider))
            .reflect(&state())
            .await;
        assert_eq!(decision.outcome, ReflectionOutcome::Answer);
        assert!(decision.updated_evidence.is_empty());
        assert!((decision.confidence - FALLBACK_CONFIDENCE).abs() < 1e-6);
    }

    #[tokio::test]
    async fn garbage_output_degrades_to_answer_now() {
        let provider = Arc::new(ScriptedDecider::new(vec!["looks promising, keep going"]));
        let decision = Reflector::new(provider).reflect(&state()).await;
        assert_eq!(decision.outcome, ReflectionOutcome::Answer);
    }

    #[test]
    fn confidence_is_clamped() {
        let decision = parse_reflection(&reflection_json("answer", "done", 2.0)).unwrap();
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn prompt_highlights_the_latest_observation() {
        let mut state = state();
        state
            .observations
            .push(observation("knowledge_search", true, "3 results: backoff docs"));
        state
            .observations
            .push(observation("service_status", true, "all systems operational"));

        let prompt = situation_prompt(&state);
        let latest_at = prompt.find("Latest observation").unwrap();
        let earlier_at = prompt.find("Earlier observations").unwrap();
        assert!(latest_at < earlier_at);
        assert!(prompt[latest_at..earlier_at].contains("all systems operational"));
        assert!(prompt[earlier_at..].contains("backoff docs"));
        assert!(!prompt[earlier_at..].contains("all systems operational"));
    }

    #[test]
    fn prompt_reports_remaining_budget() {
        let mut state = state();
        state.step = 4;
        let prompt = situation_prompt(&state);
        assert!(prompt.contains(&format!(
            "Steps remaining: {} of {}.",
            state.step_budget - 4,
            state.step_budget
        )));
    }
}

//! Plan and reflection decision sum types.
//!
//! A `Plan` is what the planning stage hands the governor: do one thing next,
//! answer now, or ask the user. Exactly one variant is active at a time and a
//! new plan always supersedes the previous one — plans are never merged.

use serde::{Deserialize, Serialize};

/// The next move for a task, as decided by planning or reflection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Plan {
    /// Invoke a capability.
    Action {
        name: String,
        arguments: serde_json::Value,
        rationale: String,
    },

    /// Terminal: answer the user.
    Answer {
        content: String,
        /// Self-reported certainty, always in [0, 1]
        confidence: f32,
        rationale: String,
    },

    /// Terminal: ask the user a clarifying question.
    Clarify { question: String, rationale: String },
}

impl Plan {
    /// Whether this plan ends the loop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Plan::Action { .. })
    }
}

/// How reflection classified the current situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionOutcome {
    /// Keep working — the current plan is superseded and a new one requested.
    Continue,
    /// Enough evidence to answer.
    Answer,
    /// The query cannot be resolved without more input from the user.
    Clarify,
}

/// The structured output of the reflection stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionDecision {
    pub outcome: ReflectionOutcome,

    /// Replacement for the task's evidence. Applied only if non-empty;
    /// existing evidence is never cleared back to empty.
    #[serde(default)]
    pub updated_evidence: String,

    /// Certainty in the outcome, always in [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f32,

    #[serde(default)]
    pub rationale: String,
}

fn default_confidence() -> f32 {
    0.5
}

/// Clamp a score or confidence into the unit interval.
///
/// NaN maps to 0.0 so a garbage model output can never poison routing.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_plans_are_not_terminal() {
        let plan = Plan::Action {
            name: "knowledge_search".into(),
            arguments: serde_json::json!({"query": "oauth2"}),
            rationale: "need docs".into(),
        };
        assert!(!plan.is_terminal());
    }

    #[test]
    fn answer_and_clarify_are_terminal() {
        let answer = Plan::Answer {
            content: "Set the redirect URI in the console.".into(),
            confidence: 0.9,
            rationale: "docs confirm".into(),
        };
        let clarify = Plan::Clarify {
            question: "Which identity provider are you using?".into(),
            rationale: "ambiguous".into(),
        };
        assert!(answer.is_terminal());
        assert!(clarify.is_terminal());
    }

    #[test]
    fn plan_serializes_with_type_tag() {
        let plan = Plan::Clarify {
            question: "Which version?".into(),
            rationale: "version-specific behavior".into(),
        };
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"type\":\"clarify\""));
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Plan::Clarify { .. }));
    }

    #[test]
    fn reflection_decision_tolerates_sparse_json() {
        let decision: ReflectionDecision =
            serde_json::from_str(r#"{"outcome": "continue"}"#).unwrap();
        assert_eq!(decision.outcome, ReflectionOutcome::Continue);
        assert!((decision.confidence - 0.5).abs() < f32::EPSILON);
        assert!(decision.updated_evidence.is_empty());
    }

    #[test]
    fn clamp_unit_bounds_and_nan() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.3), 0.0);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert!((clamp_unit(0.42) - 0.42).abs() < f32::EPSILON);
    }
}

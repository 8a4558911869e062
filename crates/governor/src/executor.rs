//! Action executor — drains the pending queue through a six-stage pipeline.
//!
//! Per request, in submission order: resolve the capability and its schema,
//! align arguments, clamp result sizes late in the budget, suppress
//! duplicates, invoke, summarize. Every stage failure becomes a failed
//! Observation; nothing in here ever aborts the loop.

use std::sync::Arc;
use tracing::{debug, warn};
use triagent_core::{
    ActionRequest, CapabilityRegistry, InvocationContext, Observation,
};

use crate::align::align_arguments;
use crate::fingerprint::fingerprint;
use crate::state::TaskState;

/// List items kept in a success summary.
pub const MAX_SUMMARY_ITEMS: usize = 3;
/// Character budget per summarized list item.
pub const MAX_SUMMARY_ITEM_CHARS: usize = 160;
/// Character budget for a scalar or object summary.
pub const MAX_SUMMARY_CHARS: usize = 480;

/// What result-limiting arguments are clamped to once the budget runs low.
pub const LATE_BUDGET_RESULT_CAP: u64 = 3;
const RESULT_LIMIT_KEYS: [&str; 3] = ["top_k", "limit", "max_results"];

pub struct Executor {
    registry: Arc<CapabilityRegistry>,
}

impl Executor {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// Execute every pending request, appending one Observation per request.
    pub async fn run_pending(&self, state: &mut TaskState) {
        while let Some(request) = state.pending.pop_front() {
            let observation = self.execute_one(&request, state).await;
            state.record_observation(observation);
        }
    }

    async fn execute_one(&self, request: &ActionRequest, state: &mut TaskState) -> Observation {
        let name = request.name.as_str();

        // 1. resolve against the registry and the task's allowed set
        let allowed = state
            .allowed_actions
            .as_ref()
            .map(|list| list.iter().any(|a| a == name))
            .unwrap_or(true);
        let Some(schema) = self.registry.schema(name).filter(|_| allowed) else {
            warn!(action = name, allowed, "capability unavailable");
            return Observation::failure(request, format!("{name} unavailable"));
        };

        // 2. align arguments against the declared schema
        let aligned = align_arguments(&schema, &request.arguments);
        if !aligned.dropped.is_empty() {
            debug!(action = name, dropped = ?aligned.dropped, "dropped undeclared arguments");
        }

        // 3. unresolved issues block execution
        if !aligned.is_clean() {
            return Observation::failure(
                request,
                format!("invalid arguments for {name}: {}", aligned.issues.join("; ")),
            );
        }

        // 4. late-budget clamp on result-limiting arguments
        let mut arguments = aligned.arguments;
        if state.remaining_steps() < 2 {
            clamp_result_limits(&mut arguments);
        }

        // 5. duplicate suppression over the canonical fingerprint
        let print = fingerprint(name, &arguments);
        if state.seen_fingerprints.contains(&print) {
            state.duplicate_calls += 1;
            debug!(action = name, "duplicate invocation suppressed");
            return Observation::failure(request, "Duplicate invocation suppressed");
        }

        // 6. invoke
        let ctx = InvocationContext {
            task_id: state.task_id.clone(),
            step: state.step,
            remaining_steps: state.remaining_steps(),
        };
        match self.registry.invoke(name, arguments, &ctx).await {
            Ok(result) if result.success => {
                state.seen_fingerprints.insert(print);
                let payload = result.payload.unwrap_or(serde_json::Value::Null);
                let summary = summarize_payload(&payload);
                debug!(action = name, %summary, "capability succeeded");
                Observation::success(request, payload, summary)
            }
            Ok(result) => {
                let error = result
                    .error
                    .unwrap_or_else(|| format!("{name} reported failure"));
                warn!(action = name, %error, "capability reported failure");
                Observation::failure(request, error)
            }
            Err(e) => {
                warn!(action = name, error = %e, "capability call failed");
                Observation::failure(request, e.to_string())
            }
        }
    }
}

/// Clamp any present result-limiting argument down to the late-budget cap.
fn clamp_result_limits(arguments: &mut serde_json::Value) {
    let Some(map) = arguments.as_object_mut() else {
        return;
    };
    for key in RESULT_LIMIT_KEYS {
        if let Some(value) = map.get_mut(key)
            && let Some(n) = value.as_u64()
            && n > LATE_BUDGET_RESULT_CAP
        {
            debug!(key, from = n, to = LATE_BUDGET_RESULT_CAP, "late-budget clamp");
            *value = serde_json::Value::from(LATE_BUDGET_RESULT_CAP);
        }
    }
}

/// Render a payload into a bounded human-readable summary.
///
/// Lists show their first few items, each truncated; everything else is
/// rendered whole and truncated once.
pub fn summarize_payload(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                return "0 results".to_string();
            }
            let shown: Vec<String> = items
                .iter()
                .take(MAX_SUMMARY_ITEMS)
                .map(|item| truncate_chars(&render_item(item), MAX_SUMMARY_ITEM_CHARS))
                .collect();
            format!("{} results: {}", items.len(), shown.join("; "))
        }
        other => truncate_chars(&render_item(other), MAX_SUMMARY_CHARS),
    }
}

fn render_item(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use triagent_core::{Capability, CapabilityError, InvocationResult, TaskInput};

    struct SearchCapability;

    #[async_trait]
    impl Capability for SearchCapability {
        fn name(&self) -> &str {
            "knowledge_search"
        }
        fn description(&self) -> &str {
            "Search the knowledge base"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "top_k": { "type": "integer" }
                },
                "required": ["query"]
            })
        }
        async fn invoke(
            &self,
            arguments: serde_json::Value,
            _ctx: &InvocationContext,
        ) -> Result<InvocationResult, CapabilityError> {
            Ok(InvocationResult::ok(json!({
                "echo": arguments
            })))
        }
    }

    struct FlakyCapability;

    #[async_trait]
    impl Capability for FlakyCapability {
        fn name(&self) -> &str {
            "flaky"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}, "additionalProperties": true})
        }
        async fn invoke(
            &self,
            _arguments: serde_json::Value,
            _ctx: &InvocationContext,
        ) -> Result<InvocationResult, CapabilityError> {
            Ok(InvocationResult::fail("backend unavailable"))
        }
    }

    fn registry() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(SearchCapability));
        registry.register(Box::new(FlakyCapability));
        Arc::new(registry)
    }

    fn state_with(requests: Vec<ActionRequest>) -> TaskState {
        let mut state = TaskState::new(&TaskInput::new("configure oauth2"));
        state.pending = requests.into();
        state
    }

    #[tokio::test]
    async fn successful_invocation_records_fingerprint() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![ActionRequest::new(
            "knowledge_search",
            json!({"query": "oauth2"}),
        )]);
        executor.run_pending(&mut state).await;
        assert_eq!(state.observations.len(), 1);
        assert!(state.observations[0].success);
        assert_eq!(state.seen_fingerprints.len(), 1);
        assert!(state.pending.is_empty());
    }

    #[tokio::test]
    async fn duplicate_in_same_batch_is_suppressed() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![
            ActionRequest::new("knowledge_search", json!({"query": "oauth2"})),
            ActionRequest::new("knowledge_search", json!({"query": "oauth2"})),
        ]);
        executor.run_pending(&mut state).await;
        assert_eq!(state.observations.len(), 2);
        assert!(state.observations[0].success);
        assert!(!state.observations[1].success);
        assert_eq!(
            state.observations[1].error.as_deref(),
            Some("Duplicate invocation suppressed")
        );
        assert_eq!(state.duplicate_calls, 1);
        assert_eq!(state.seen_fingerprints.len(), 1);
    }

    #[tokio::test]
    async fn key_order_still_counts_as_duplicate() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![
            ActionRequest::new("knowledge_search", json!({"query": "sso", "top_k": 2})),
            ActionRequest::new("knowledge_search", json!({"top_k": 2, "query": "sso"})),
        ]);
        executor.run_pending(&mut state).await;
        assert_eq!(state.duplicate_calls, 1);
    }

    #[tokio::test]
    async fn failed_invocation_does_not_record_fingerprint() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![
            ActionRequest::new("flaky", json!({})),
            ActionRequest::new("flaky", json!({})),
        ]);
        executor.run_pending(&mut state).await;
        // a failed call may be retried; only successes pin a fingerprint
        assert_eq!(state.failed_count(), 2);
        assert_eq!(state.duplicate_calls, 0);
        assert!(state.seen_fingerprints.is_empty());
        assert_eq!(state.last_error.as_deref(), Some("backend unavailable"));
    }

    #[tokio::test]
    async fn unknown_capability_is_unavailable() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![ActionRequest::new("nonexistent", json!({}))]);
        executor.run_pending(&mut state).await;
        assert_eq!(
            state.observations[0].error.as_deref(),
            Some("nonexistent unavailable")
        );
    }

    #[tokio::test]
    async fn disallowed_capability_is_unavailable() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![ActionRequest::new(
            "knowledge_search",
            json!({"query": "x"}),
        )]);
        state.allowed_actions = Some(vec!["ticket_lookup".into()]);
        executor.run_pending(&mut state).await;
        assert!(!state.observations[0].success);
        assert!(
            state.observations[0]
                .error
                .as_deref()
                .unwrap()
                .contains("unavailable")
        );
    }

    #[tokio::test]
    async fn unresolvable_arguments_block_execution() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![ActionRequest::new("knowledge_search", json!({}))]);
        executor.run_pending(&mut state).await;
        let error = state.observations[0].error.as_deref().unwrap();
        assert!(error.starts_with("invalid arguments for knowledge_search"));
        assert!(error.contains("query"));
    }

    #[tokio::test]
    async fn alias_substitution_reaches_the_capability() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![ActionRequest::new(
            "knowledge_search",
            json!({"input": "webhook retries"}),
        )]);
        executor.run_pending(&mut state).await;
        let obs = &state.observations[0];
        assert!(obs.success);
        let echoed = &obs.payload.as_ref().unwrap()["echo"];
        assert_eq!(echoed["query"], "webhook retries");
        assert!(echoed.get("input").is_none());
    }

    #[tokio::test]
    async fn late_budget_clamps_top_k() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![ActionRequest::new(
            "knowledge_search",
            json!({"query": "oauth2", "top_k": 10}),
        )]);
        state.step = 5; // one step remaining of six
        executor.run_pending(&mut state).await;
        let echoed = &state.observations[0].payload.as_ref().unwrap()["echo"];
        assert_eq!(echoed["top_k"], LATE_BUDGET_RESULT_CAP);
    }

    #[tokio::test]
    async fn early_budget_leaves_top_k_alone() {
        let executor = Executor::new(registry());
        let mut state = state_with(vec![ActionRequest::new(
            "knowledge_search",
            json!({"query": "oauth2", "top_k": 10}),
        )]);
        executor.run_pending(&mut state).await;
        let echoed = &state.observations[0].payload.as_ref().unwrap()["echo"];
        assert_eq!(echoed["top_k"], 10);
    }

    #[test]
    fn summaries_are_bounded() {
        let long = "x".repeat(500);
        let list = json!([long.clone(), "second", "third", "fourth"]);
        let summary = summarize_payload(&list);
        assert!(summary.starts_with("4 results: "));
        assert!(summary.contains("second"));
        assert!(summary.contains("third"));
        assert!(!summary.contains("fourth"));

        let scalar_summary = summarize_payload(&json!(long.clone() + &long));
        assert_eq!(scalar_summary.chars().count(), MAX_SUMMARY_CHARS);

        assert_eq!(summarize_payload(&json!([])), "0 results");
    }
}

//! Deep-research capability — the retrieval-refinement loop as an action.
//!
//! Where `knowledge_search` does one pass, this retrieves, scores adequacy,
//! refines the query, and repeats up to the iteration bound. Compound
//! queries are decomposed first and refined one sub-query at a time. The
//! payload carries the audit trail so the reflection stage can see how the
//! evidence was gathered.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use triagent_core::{
    Capability, CapabilityError, InvocationContext, InvocationResult, Retriever, UserProfile,
};
use triagent_retrieval::{
    QueryDecomposer, RefinementConfig, RefinementEngine, RefinementOutcome, RerankWeights, Reranker,
};

/// Iteration bound a caller may request, regardless of configuration.
const MAX_REQUESTED_ITERATIONS: u64 = 5;

/// Documents included in the payload (the union can be large).
const MAX_PAYLOAD_DOCUMENTS: usize = 5;

pub struct DeepResearchCapability {
    retriever: Arc<dyn Retriever>,
    weights: RerankWeights,
    config: RefinementConfig,
}

impl DeepResearchCapability {
    pub fn new(retriever: Arc<dyn Retriever>, config: RefinementConfig) -> Self {
        Self {
            retriever,
            weights: RerankWeights::default(),
            config,
        }
    }

    pub fn with_weights(mut self, weights: RerankWeights) -> Self {
        self.weights = weights;
        self
    }
}

#[async_trait]
impl Capability for DeepResearchCapability {
    fn name(&self) -> &str {
        "deep_research"
    }

    fn description(&self) -> &str {
        "Run an iterative research pass: retrieve, score adequacy, refine the query, repeat. \
         Slower but more thorough than knowledge_search."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question to research"
                },
                "max_iterations": {
                    "type": "integer",
                    "description": "Refinement passes allowed (1-5, default from config)"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _ctx: &InvocationContext,
    ) -> std::result::Result<InvocationResult, CapabilityError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| CapabilityError::InvalidArguments("Missing 'query' argument".into()))?;

        let mut config = self.config.clone();
        if let Some(n) = arguments["max_iterations"].as_u64() {
            config.max_iterations = n.clamp(1, MAX_REQUESTED_ITERATIONS) as u32;
        }

        let decomposer = QueryDecomposer::new(config.max_sub_queries, config.complexity_threshold);
        let engine = RefinementEngine::new(
            self.retriever.clone(),
            Reranker::new(self.weights),
            config,
        );
        let outcome = engine
            .run_decomposed(query, &UserProfile::default(), &decomposer)
            .await;

        // the weakest sub-query bounds how well-researched the whole answer is
        let adequacy = outcome
            .runs
            .iter()
            .map(|r| r.final_adequacy)
            .fold(1.0f32, f32::min);

        info!(
            query,
            sub_queries = outcome.plan.len(),
            documents = outcome.documents.len(),
            adequacy,
            "deep research complete"
        );

        let documents: Vec<serde_json::Value> = outcome
            .documents
            .iter()
            .take(MAX_PAYLOAD_DOCUMENTS)
            .map(|d| {
                serde_json::json!({
                    "content": d.content,
                    "source": d.source,
                    "score": d.score,
                })
            })
            .collect();

        let payload = match outcome.runs.as_slice() {
            [run] => serde_json::json!({
                "final_adequacy": run.final_adequacy,
                "iterations": iteration_trail(run),
                "documents": documents,
            }),
            runs => serde_json::json!({
                "final_adequacy": adequacy,
                "sub_queries": outcome
                    .plan
                    .iter()
                    .zip(runs)
                    .map(|(sub, run)| {
                        serde_json::json!({
                            "query": sub.sub_query,
                            "intent": sub.intent,
                            "adequacy": run.final_adequacy,
                            "passes": run.iterations.len(),
                            "documents": run.documents.len(),
                        })
                    })
                    .collect::<Vec<_>>(),
                "documents": documents,
            }),
        };

        Ok(InvocationResult::ok(payload))
    }
}

fn iteration_trail(run: &RefinementOutcome) -> Vec<serde_json::Value> {
    run.iterations
        .iter()
        .map(|it| {
            serde_json::json!({
                "query": it.query,
                "adequacy": it.adequacy,
                "documents": it.documents.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use triagent_core::{RetrievalError, SearchFilters, TaskId};
    use triagent_retrieval::KeywordRetriever;

    struct EmptyRetriever;

    #[async_trait]
    impl Retriever for EmptyRetriever {
        fn name(&self) -> &str {
            "empty"
        }

        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            _top_k: usize,
        ) -> Result<Vec<triagent_core::Document>, RetrievalError> {
            Ok(Vec::new())
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext {
            task_id: TaskId::new(),
            step: 1,
            remaining_steps: 5,
        }
    }

    #[tokio::test]
    async fn research_gathers_documents_with_a_trail() {
        let capability = DeepResearchCapability::new(
            Arc::new(KeywordRetriever::demo()),
            RefinementConfig::default(),
        );
        let result = capability
            .invoke(serde_json::json!({"query": "configure oauth2 redirect"}), &ctx())
            .await
            .unwrap();

        assert!(result.success);
        let payload = result.payload.unwrap();
        assert!(payload["final_adequacy"].as_f64().unwrap() > 0.0);
        assert!(!payload["iterations"].as_array().unwrap().is_empty());
        assert!(!payload["documents"].as_array().unwrap().is_empty());
        assert_eq!(
            payload["iterations"][0]["query"],
            "configure oauth2 redirect"
        );
    }

    #[tokio::test]
    async fn requested_iteration_bound_is_honored() {
        let capability =
            DeepResearchCapability::new(Arc::new(EmptyRetriever), RefinementConfig::default());
        let result = capability
            .invoke(
                serde_json::json!({"query": "unknown topic", "max_iterations": 2}),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.success);
        let payload = result.payload.unwrap();
        assert_eq!(payload["iterations"].as_array().unwrap().len(), 2);
        assert!(payload["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_iteration_request_is_clamped() {
        let capability =
            DeepResearchCapability::new(Arc::new(EmptyRetriever), RefinementConfig::default());
        let result = capability
            .invoke(
                serde_json::json!({"query": "unknown topic", "max_iterations": 40}),
                &ctx(),
            )
            .await
            .unwrap();

        let payload = result.payload.unwrap();
        assert_eq!(
            payload["iterations"].as_array().unwrap().len(),
            MAX_REQUESTED_ITERATIONS as usize
        );
    }

    #[tokio::test]
    async fn compound_query_gets_one_run_per_intent() {
        let capability =
            DeepResearchCapability::new(Arc::new(EmptyRetriever), RefinementConfig::default());
        let result = capability
            .invoke(
                serde_json::json!({
                    "query": "My webhook delivery fails and retries are not working, always a \
                              timeout error. How do I configure the retry settings?",
                    "max_iterations": 1
                }),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.success);
        let payload = result.payload.unwrap();
        let subs = payload["sub_queries"].as_array().unwrap();
        assert!(subs.len() >= 2);
        // highest-priority sub-query first
        assert_eq!(subs[0]["intent"], "troubleshooting");
        assert!(subs.iter().any(|s| s["intent"] == "configuration"));
        for sub in subs {
            assert_eq!(sub["passes"], 1);
        }
        assert!(payload.get("iterations").is_none());
        assert!(payload["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_query_is_invalid_arguments() {
        let capability = DeepResearchCapability::new(
            Arc::new(KeywordRetriever::demo()),
            RefinementConfig::default(),
        );
        let err = capability
            .invoke(serde_json::json!({}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments(_)));
    }
}

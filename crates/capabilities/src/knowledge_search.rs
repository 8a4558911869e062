//! Knowledge-base search capability.
//!
//! Exposes one retrieval pass over the configured [`Retriever`] backend.
//! The planner reaches for this first; `deep_research` is the slower,
//! iterating alternative.

use std::sync::Arc;

use async_trait::async_trait;
use triagent_core::{
    Capability, CapabilityError, InvocationContext, InvocationResult, Retriever, SearchFilters,
};

/// Upper bound on requested results regardless of arguments.
const MAX_TOP_K: u64 = 10;

pub struct KnowledgeSearchCapability {
    retriever: Arc<dyn Retriever>,
    default_top_k: usize,
}

impl KnowledgeSearchCapability {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            retriever,
            default_top_k: 5,
        }
    }

    pub fn with_top_k(mut self, default_top_k: usize) -> Self {
        self.default_top_k = default_top_k;
        self
    }
}

#[async_trait]
impl Capability for KnowledgeSearchCapability {
    fn name(&self) -> &str {
        "knowledge_search"
    }

    fn description(&self) -> &str {
        "Search the support knowledge base. Returns document excerpts sorted by relevance."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search the knowledge base for"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum number of documents to return (default 5)",
                    "default": 5
                },
                "category": {
                    "type": "string",
                    "description": "Restrict results to one category (guide, reference, troubleshooting, faq)"
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

        let top_k = arguments["top_k"]
            .as_u64()
            .unwrap_or(self.default_top_k as u64)
            .min(MAX_TOP_K) as usize;

        let filters = SearchFilters {
            category: arguments["category"].as_str().map(String::from),
            source: None,
        };

        match self.retriever.search(query, &filters, top_k).await {
            Ok(documents) => {
                let results: Vec<serde_json::Value> = documents
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "content": d.content,
                            "source": d.source,
                            "score": d.score,
                        })
                    })
                    .collect();
                Ok(InvocationResult::ok(serde_json::Value::Array(results)))
            }
            Err(e) => Ok(InvocationResult::fail(format!("search failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triagent_core::{RetrievalError, TaskId};
    use triagent_retrieval::KeywordRetriever;

    struct FailingRetriever;

    #[async_trait]
    impl Retriever for FailingRetriever {
        fn name(&self) -> &str {
            "failing"
        }

        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            _top_k: usize,
        ) -> Result<Vec<triagent_core::Document>, RetrievalError> {
            Err(RetrievalError::Backend("index offline".into()))
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext {
            task_id: TaskId::new(),
            step: 1,
            remaining_steps: 5,
        }
    }

    fn capability() -> KnowledgeSearchCapability {
        KnowledgeSearchCapability::new(Arc::new(KeywordRetriever::demo()))
    }

    #[tokio::test]
    async fn search_returns_scored_documents() {
        let result = capability()
            .invoke(
                serde_json::json!({"query": "configure oauth2 redirect"}),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.success);
        let payload = result.payload.unwrap();
        let docs = payload.as_array().unwrap();
        assert!(!docs.is_empty());
        assert!(docs[0]["content"].as_str().unwrap().contains("redirect"));
        assert!(docs[0]["score"].as_f64().unwrap() > 0.0);
        assert!(docs[0]["source"].is_string());
    }

    #[tokio::test]
    async fn top_k_bounds_the_result_count() {
        let result = capability()
            .invoke(serde_json::json!({"query": "oauth2", "top_k": 2}), &ctx())
            .await
            .unwrap();

        assert_eq!(result.payload.unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn category_filter_narrows_results() {
        let result = capability()
            .invoke(
                serde_json::json!({"query": "oauth2", "category": "troubleshooting"}),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.success);
        let payload = result.payload.unwrap();
        let docs = payload.as_array().unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0]["content"].as_str().unwrap().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn unmatched_query_is_an_empty_success() {
        let result = capability()
            .invoke(
                serde_json::json!({"query": "quantum chromodynamics"}),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.payload.unwrap().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_query_is_invalid_arguments() {
        let err = capability()
            .invoke(serde_json::json!({}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments(_)));

        let err = capability()
            .invoke(serde_json::json!({"query": "   "}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn backend_failure_is_a_failed_result_not_an_error() {
        let capability = KnowledgeSearchCapability::new(Arc::new(FailingRetriever));
        let result = capability
            .invoke(serde_json::json!({"query": "anything"}), &ctx())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("search failed"));
    }

    #[test]
    fn spec_declares_query_required() {
        let spec = capability().to_spec();
        assert_eq!(spec.name, "knowledge_search");
        assert_eq!(spec.input_schema["required"][0], "query");
    }
}

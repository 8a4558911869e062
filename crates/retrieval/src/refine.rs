//! The iterative retrieval-refinement loop.
//!
//! Retrieve, optionally rerank, score adequacy against the original query,
//! and either stop or retry with a refined query keyed to the first
//! information gap. Hard-bounded by `max_iterations`; every pass is recorded
//! in an audit trail that is never pruned.
//!
//! A retrieval failure is downgraded to an empty pass — the loop never
//! propagates a backend error, it just keeps (bounded) going.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use triagent_core::{Document, Retriever, SearchFilters, UserProfile};

use crate::adequacy::{self, AdequacyReport, GapKind, InformationGap};
use crate::decompose::{DecomposedQuery, QueryDecomposer};
use crate::rerank::Reranker;

/// Bounds and switches for one refinement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Retrieval passes allowed (at least 1)
    pub max_iterations: u32,

    /// Stop once adequacy reaches this score
    pub adequacy_threshold: f32,

    /// Documents requested per pass
    pub top_k: usize,

    /// Whether reranking runs between retrieval and adequacy scoring
    pub rerank: bool,

    /// Upper bound on sub-queries after decomposition
    pub max_sub_queries: usize,

    /// Complexity score at or above which decomposition applies
    pub complexity_threshold: f32,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            adequacy_threshold: 0.75,
            top_k: 5,
            rerank: true,
            max_sub_queries: 4,
            complexity_threshold: 0.5,
        }
    }
}

/// One recorded pass of the loop. Append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalIteration {
    /// 1-based pass number
    pub index: u32,

    /// The query this pass actually searched for
    pub query: String,

    /// Documents of this pass, in (reranked) relevance order
    pub documents: Vec<Document>,

    pub adequacy: f32,
    pub gaps: Vec<InformationGap>,

    /// Why the next query looks the way it does (empty on the final pass)
    pub rationale: String,
}

/// The result of a full refinement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub original_query: String,

    /// Every pass, in order; never pruned
    pub iterations: Vec<RetrievalIteration>,

    /// De-duplicated union of all retrieved documents, first-seen order
    pub documents: Vec<Document>,

    pub final_adequacy: f32,
}

/// A decomposed run: one refinement per sub-query, merged at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposedOutcome {
    pub plan: Vec<DecomposedQuery>,
    pub runs: Vec<RefinementOutcome>,

    /// Union of all runs' documents, de-duplicated in first-seen order
    pub documents: Vec<Document>,
}

pub struct RefinementEngine {
    retriever: Arc<dyn Retriever>,
    reranker: Reranker,
    config: RefinementConfig,
}

impl RefinementEngine {
    pub fn new(retriever: Arc<dyn Retriever>, reranker: Reranker, config: RefinementConfig) -> Self {
        Self {
            retriever,
            reranker,
            config,
        }
    }

    /// Run the bounded refinement loop for one query.
    pub async fn run(&self, query: &str, profile: &UserProfile) -> RefinementOutcome {
        let mut iterations: Vec<RetrievalIteration> = Vec::new();
        let mut union: Vec<Document> = Vec::new();
        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut current_query = query.to_string();
        let mut adequacy = 0.0f32;
        let max_iterations = self.config.max_iterations.max(1);

        let mut iteration = 0u32;
        while iteration < max_iterations && adequacy < self.config.adequacy_threshold {
            iteration += 1;

            let retrieved = match self
                .retriever
                .search(&current_query, &SearchFilters::none(), self.config.top_k)
                .await
            {
                Ok(docs) => docs,
                Err(e) => {
                    tracing::warn!(
                        backend = self.retriever.name(),
                        error = %e,
                        "retrieval failed, treating pass as empty"
                    );
                    Vec::new()
                }
            };

            let (documents, avg_relevance) = if self.config.rerank {
                let reranked = self
                    .reranker
                    .rerank(&current_query, retrieved, profile, self.config.top_k)
                    .await;
                let avg = average(reranked.iter().map(|d| d.final_score));
                (
                    reranked.into_iter().map(|d| d.document).collect::<Vec<_>>(),
                    avg,
                )
            } else {
                let avg = average(retrieved.iter().map(|d| d.score));
                (retrieved, avg)
            };

            let AdequacyReport { score, gaps } =
                adequacy::evaluate(query, &documents, avg_relevance, iteration);
            adequacy = score;

            for doc in &documents {
                if seen_keys.insert(doc.dedup_key()) {
                    union.push(doc.clone());
                }
            }

            let more_to_do = adequacy < self.config.adequacy_threshold && iteration < max_iterations;
            let (refined, rationale) = if more_to_do {
                next_query(query, &gaps)
            } else {
                (String::new(), String::new())
            };

            tracing::info!(
                iteration,
                query = %current_query,
                documents = documents.len(),
                adequacy,
                gaps = gaps.len(),
                "refinement pass complete"
            );

            iterations.push(RetrievalIteration {
                index: iteration,
                query: current_query.clone(),
                documents,
                adequacy,
                gaps,
                rationale,
            });

            if more_to_do {
                current_query = refined;
            }
        }

        RefinementOutcome {
            original_query: query.to_string(),
            iterations,
            documents: union,
            final_adequacy: adequacy,
        }
    }

    /// Decompose a query and run one refinement per sub-query, in priority
    /// order. Sub-queries execute sequentially regardless of strategy — the
    /// strategy records logical dependence, not scheduling.
    pub async fn run_decomposed(
        &self,
        query: &str,
        profile: &UserProfile,
        decomposer: &QueryDecomposer,
    ) -> DecomposedOutcome {
        let plan = decomposer.decompose(query);
        let mut runs = Vec::with_capacity(plan.len());
        let mut union: Vec<Document> = Vec::new();
        let mut seen_keys: HashSet<String> = HashSet::new();

        for sub in &plan {
            let outcome = self.run(&sub.sub_query, profile).await;
            for doc in &outcome.documents {
                if seen_keys.insert(doc.dedup_key()) {
                    union.push(doc.clone());
                }
            }
            runs.push(outcome);
        }

        DecomposedOutcome {
            plan,
            runs,
            documents: union,
        }
    }
}

fn average(scores: impl Iterator<Item = f32>) -> f32 {
    let collected: Vec<f32> = scores.collect();
    if collected.is_empty() {
        0.0
    } else {
        collected.iter().sum::<f32>() / collected.len() as f32
    }
}

/// Build the next query from the original plus a suffix keyed to the first
/// detected gap. Refined queries never compound on each other.
fn next_query(original: &str, gaps: &[InformationGap]) -> (String, String) {
    match gaps.first() {
        Some(gap) if gap.kind == GapKind::NarrowSourceCoverage => (
            format!("{original} across guides, references, and troubleshooting"),
            "broadening source categories".into(),
        ),
        Some(gap) if gap.kind == GapKind::NotEnoughDocuments => (
            format!("{original} setup and configuration"),
            "widening toward setup material".into(),
        ),
        Some(gap) if gap.kind == GapKind::MissingKeywords => (
            format!("{original} {}", gap.keywords.join(" ")),
            format!("chasing uncovered terms: {}", gap.keywords.join(", ")),
        ),
        _ => (
            format!("{original} detailed guide"),
            "generic broadening".into(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use triagent_core::{DocumentMetadata, RetrievalError};

    /// Returns scripted result sets in order; empty once exhausted.
    struct ScriptedRetriever {
        responses: Mutex<VecDeque<Vec<Document>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRetriever {
        fn new(responses: Vec<Vec<Document>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Retriever for ScriptedRetriever {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn search(
            &self,
            query: &str,
            _filters: &SearchFilters,
            _top_k: usize,
        ) -> Result<Vec<Document>, RetrievalError> {
            self.calls.lock().unwrap().push(query.to_string());
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }

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
        ) -> Result<Vec<Document>, RetrievalError> {
            Err(RetrievalError::Backend("index offline".into()))
        }
    }

    fn doc(id: &str, content: &str, category: &str) -> Document {
        Document {
            id: Some(id.into()),
            content: content.into(),
            source: "official-docs".into(),
            score: 0.9,
            metadata: DocumentMetadata {
                category: Some(category.into()),
                language: None,
                last_updated: None,
            },
        }
    }

    fn engine(retriever: Arc<dyn Retriever>) -> RefinementEngine {
        RefinementEngine::new(retriever, Reranker::default(), RefinementConfig::default())
    }

    fn strong_docs() -> Vec<Document> {
        vec![
            doc("1", "Configure oauth2 redirect settings in the console.", "guide"),
            doc("2", "Oauth2 configure scopes reference table.", "reference"),
            doc("3", "Troubleshooting oauth2: configure the client id.", "troubleshooting"),
        ]
    }

    #[tokio::test]
    async fn adequate_first_pass_stops_immediately() {
        let retriever = Arc::new(ScriptedRetriever::new(vec![strong_docs()]));
        let outcome = engine(retriever.clone())
            .run("configure oauth2", &UserProfile::default())
            .await;
        assert_eq!(outcome.iterations.len(), 1);
        assert!(outcome.final_adequacy >= 0.75);
        assert_eq!(retriever.queries().len(), 1);
        // nothing planned after a terminal pass
        assert!(outcome.iterations[0].rationale.is_empty());
    }

    #[tokio::test]
    async fn empty_backend_runs_exactly_max_iterations() {
        let retriever = Arc::new(ScriptedRetriever::new(vec![]));
        let outcome = engine(retriever)
            .run("configure oauth2", &UserProfile::default())
            .await;
        assert_eq!(outcome.iterations.len(), 3);
        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.final_adequacy, 0.0);
        // every pass recorded with its gaps
        for it in &outcome.iterations {
            assert!(!it.gaps.is_empty());
        }
    }

    #[tokio::test]
    async fn backend_failure_counts_as_empty_pass() {
        let outcome = engine(Arc::new(FailingRetriever))
            .run("configure oauth2", &UserProfile::default())
            .await;
        assert_eq!(outcome.iterations.len(), 3);
        assert!(outcome.documents.is_empty());
    }

    #[tokio::test]
    async fn refined_query_is_built_from_the_original() {
        let retriever = Arc::new(ScriptedRetriever::new(vec![Vec::new(), strong_docs()]));
        let outcome = engine(retriever.clone())
            .run("configure oauth2", &UserProfile::default())
            .await;
        assert_eq!(outcome.iterations.len(), 2);
        let queries = retriever.queries();
        assert_eq!(queries[0], "configure oauth2");
        // count gap on the empty pass keys a setup-oriented suffix
        assert_eq!(queries[1], "configure oauth2 setup and configuration");
    }

    #[tokio::test]
    async fn union_documents_are_deduplicated() {
        let first = vec![doc("1", "configure oauth2 part one", "guide")];
        let second = vec![
            doc("1", "configure oauth2 part one", "guide"),
            doc("2", "configure oauth2 part two", "reference"),
            doc("3", "configure oauth2 part three", "troubleshooting"),
        ];
        let retriever = Arc::new(ScriptedRetriever::new(vec![first, second]));
        let outcome = engine(retriever)
            .run("configure oauth2", &UserProfile::default())
            .await;
        assert_eq!(outcome.documents.len(), 3);
        assert_eq!(outcome.documents[0].id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn missing_keyword_gap_appends_terms_verbatim() {
        // two documents, two categories: only the keyword gap fires
        let filler = vec![
            doc("1", "webhook delivery overview", "guide"),
            doc("2", "webhook release notes archive", "reference"),
        ];
        let retriever = Arc::new(ScriptedRetriever::new(vec![filler]));
        let config = RefinementConfig {
            max_iterations: 2,
            adequacy_threshold: 0.9,
            ..Default::default()
        };
        let engine = RefinementEngine::new(retriever.clone(), Reranker::default(), config);
        let _ = engine
            .run("webhook signature validation", &UserProfile::default())
            .await;
        let queries = retriever.queries();
        assert_eq!(
            queries[1],
            "webhook signature validation signature validation"
        );
    }

    #[tokio::test]
    async fn decomposed_run_merges_documents() {
        let retriever = Arc::new(ScriptedRetriever::new(vec![strong_docs(), strong_docs()]));
        let engine = engine(retriever);
        let outcome = engine
            .run_decomposed(
                "reset password",
                &UserProfile::default(),
                &QueryDecomposer::default(),
            )
            .await;
        assert_eq!(outcome.plan.len(), 1);
        assert_eq!(outcome.runs.len(), 1);
        assert_eq!(outcome.documents.len(), 3);
    }

    #[test]
    fn next_query_suffixes_by_gap_kind() {
        let coverage = InformationGap {
            kind: GapKind::NarrowSourceCoverage,
            detail: String::new(),
            keywords: Vec::new(),
        };
        let (q, _) = next_query("base", &[coverage]);
        assert_eq!(q, "base across guides, references, and troubleshooting");

        let (q, _) = next_query("base", &[]);
        assert_eq!(q, "base detailed guide");
    }
}

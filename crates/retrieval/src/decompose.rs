//! Query decomposition — split a complex query into ordered sub-queries.
//!
//! A cheap, fully deterministic stage: complexity is scored from length,
//! sentence count, and indicator phrases; queries below the threshold pass
//! through as a single sub-query. Complex queries are split by secondary
//! intents first, then entity mentions, then sentence boundaries, capped at
//! `max_sub_queries`.

use serde::{Deserialize, Serialize};
use triagent_core::clamp_unit;
use uuid::Uuid;

use crate::text::{normalize_token, split_sentences};

/// How the engine should run the sub-queries of one decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// One sub-query, no coordination
    Simple,
    /// Independent sub-queries (intent or entity splits)
    Parallel,
    /// Each sub-query depends on its predecessor (sentence splits)
    Sequential,
    /// Intent split across a long, multi-sentence query
    Hybrid,
}

/// What the user is fundamentally asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Troubleshooting,
    Configuration,
    Comparison,
    Account,
    HowTo,
    General,
}

/// One sub-query of a decomposed query. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposedQuery {
    pub id: String,
    pub original_query: String,
    pub sub_query: String,
    pub intent: QueryIntent,

    /// Execution priority; higher runs first
    pub priority: f32,

    /// IDs of sub-queries that must run before this one
    pub dependencies: Vec<String>,

    pub strategy: SearchStrategy,
}

/// Marker phrases per intent, checked in this order.
const INTENT_MARKERS: &[(QueryIntent, &[&str])] = &[
    (
        QueryIntent::Troubleshooting,
        &["error", "not working", "fails", "failing", "broken", "crash", "issue"],
    ),
    (
        QueryIntent::Configuration,
        &["configure", "configuration", "set up", "setup", "install", "enable", "settings"],
    ),
    (
        QueryIntent::Comparison,
        &["compare", "difference between", " vs ", "versus"],
    ),
    (
        QueryIntent::Account,
        &["billing", "invoice", "subscription", "password", "login", "account"],
    ),
    (
        QueryIntent::HowTo,
        &["how to", "how do i", "how can i", "tutorial", "walkthrough"],
    ),
];

/// Phrases that signal a compound or multi-part question.
const COMPLEXITY_MARKERS: &[&str] = &[
    "how to",
    "difference between",
    "compare",
    "integrate",
    "migrate",
    "not working",
    "as well as",
    "step by step",
    "multiple",
];

/// Entity mentions worth their own retrieval pass.
const KNOWN_ENTITIES: &[&str] = &[
    "oauth2", "oauth", "saml", "sso", "webhook", "api", "sdk", "cli", "docker", "kubernetes",
    "postgres", "redis", "stripe", "slack", "ldap", "jwt",
];

/// Score how complex a query is, in [0, 1].
pub fn complexity(query: &str) -> f32 {
    let lower = query.to_lowercase();
    let words = query.split_whitespace().count();
    let sentences = split_sentences(query).len();

    let mut score = 0.0;
    if words > 25 {
        score += 0.3;
    } else if words > 12 {
        score += 0.15;
    }
    if sentences > 2 {
        score += 0.3;
    } else if sentences == 2 {
        score += 0.15;
    }

    let marker_hits = COMPLEXITY_MARKERS
        .iter()
        .filter(|m| lower.contains(*m))
        .count();
    score += 0.2 * marker_hits.min(2) as f32;

    if lower.contains(" and ") || lower.contains(" also ") {
        score += 0.1;
    }

    clamp_unit(score)
}

/// All intents whose markers appear in the text, in table order.
fn detect_intents(text: &str) -> Vec<QueryIntent> {
    let lower = text.to_lowercase();
    INTENT_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(intent, _)| *intent)
        .collect()
}

/// The primary intent of a text (first match, else General).
fn primary_intent(text: &str) -> QueryIntent {
    detect_intents(text).first().copied().unwrap_or(QueryIntent::General)
}

/// Known entities mentioned in the text, in first-mention order.
fn detect_entities(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for token in text.split_whitespace() {
        let normalized = normalize_token(token);
        if KNOWN_ENTITIES.contains(&normalized.as_str()) && !found.contains(&normalized) {
            found.push(normalized);
        }
    }
    found
}

/// Splits complex queries into prioritized sub-queries.
pub struct QueryDecomposer {
    max_sub_queries: usize,
    complexity_threshold: f32,
}

impl Default for QueryDecomposer {
    fn default() -> Self {
        Self {
            max_sub_queries: 4,
            complexity_threshold: 0.5,
        }
    }
}

impl QueryDecomposer {
    pub fn new(max_sub_queries: usize, complexity_threshold: f32) -> Self {
        Self {
            max_sub_queries: max_sub_queries.max(1),
            complexity_threshold,
        }
    }

    /// Decompose a query. Always returns at least one sub-query; the result
    /// is sorted by priority, highest first.
    pub fn decompose(&self, query: &str) -> Vec<DecomposedQuery> {
        let score = complexity(query);
        if score < self.complexity_threshold {
            tracing::debug!(complexity = score, "query below complexity threshold");
            return vec![self.single(query)];
        }

        let sentences = split_sentences(query);
        let intents = detect_intents(query);
        let entities = detect_entities(query);

        let mut parts = if intents.len() >= 2 {
            let strategy = if sentences.len() >= 3 {
                SearchStrategy::Hybrid
            } else {
                SearchStrategy::Parallel
            };
            self.split_by_intents(query, &sentences, &intents, strategy)
        } else if entities.len() >= 2 {
            self.split_by_entities(query, &sentences, &entities)
        } else if sentences.len() >= 2 {
            self.split_by_sentences(query, &sentences)
        } else {
            vec![self.single(query)]
        };

        parts.truncate(self.max_sub_queries);
        if parts.len() == 1 {
            parts[0].strategy = SearchStrategy::Simple;
            parts[0].dependencies.clear();
        }
        parts.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        tracing::debug!(
            complexity = score,
            sub_queries = parts.len(),
            strategy = ?parts[0].strategy,
            "decomposed query"
        );
        parts
    }

    fn single(&self, query: &str) -> DecomposedQuery {
        DecomposedQuery {
            id: Uuid::new_v4().to_string(),
            original_query: query.to_string(),
            sub_query: query.to_string(),
            intent: primary_intent(query),
            priority: 1.0,
            dependencies: Vec::new(),
            strategy: SearchStrategy::Simple,
        }
    }

    /// One sub-query per detected intent, built from the sentences that
    /// carry that intent's markers (whole query when none do).
    fn split_by_intents(
        &self,
        query: &str,
        sentences: &[String],
        intents: &[QueryIntent],
        strategy: SearchStrategy,
    ) -> Vec<DecomposedQuery> {
        intents
            .iter()
            .enumerate()
            .map(|(index, intent)| {
                let matching: Vec<&str> = sentences
                    .iter()
                    .filter(|s| detect_intents(s).contains(intent))
                    .map(String::as_str)
                    .collect();
                let sub_query = if matching.is_empty() {
                    query.to_string()
                } else {
                    matching.join(". ")
                };
                DecomposedQuery {
                    id: Uuid::new_v4().to_string(),
                    original_query: query.to_string(),
                    sub_query,
                    intent: *intent,
                    priority: priority_for(*intent, index),
                    dependencies: Vec::new(),
                    strategy,
                }
            })
            .collect()
    }

    /// One sub-query per entity, scoped to the sentence mentioning it.
    fn split_by_entities(
        &self,
        query: &str,
        sentences: &[String],
        entities: &[String],
    ) -> Vec<DecomposedQuery> {
        entities
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                let scoped = sentences
                    .iter()
                    .find(|s| s.to_lowercase().contains(entity.as_str()))
                    .cloned()
                    .unwrap_or_else(|| query.to_string());
                let intent = primary_intent(&scoped);
                DecomposedQuery {
                    id: Uuid::new_v4().to_string(),
                    original_query: query.to_string(),
                    sub_query: format!("{scoped} {entity}"),
                    intent,
                    priority: priority_for(intent, index),
                    dependencies: Vec::new(),
                    strategy: SearchStrategy::Parallel,
                }
            })
            .collect()
    }

    /// One sub-query per sentence, each depending on its predecessor.
    fn split_by_sentences(&self, query: &str, sentences: &[String]) -> Vec<DecomposedQuery> {
        let mut parts: Vec<DecomposedQuery> = Vec::with_capacity(sentences.len());
        for (index, sentence) in sentences.iter().enumerate() {
            let intent = primary_intent(sentence);
            let dependencies = parts.last().map(|p: &DecomposedQuery| vec![p.id.clone()]);
            parts.push(DecomposedQuery {
                id: Uuid::new_v4().to_string(),
                original_query: query.to_string(),
                sub_query: sentence.clone(),
                intent,
                priority: priority_for(intent, index),
                dependencies: dependencies.unwrap_or_default(),
                strategy: SearchStrategy::Sequential,
            });
        }
        parts
    }
}

/// Intent-relevance bonus plus inverse of original order.
fn priority_for(intent: QueryIntent, index: usize) -> f32 {
    let bonus = if intent == QueryIntent::General { 0.0 } else { 1.0 };
    bonus + 1.0 / (index + 1) as f32
}

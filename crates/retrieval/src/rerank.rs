//! Reranking — blend semantic, contextual, and freshness signals.
//!
//! The semantic score is a lexical heuristic unless an external semantic
//! model is injected, in which case scoring is delegated to it. Contextual
//! scoring personalizes against the user profile; freshness is a step
//! function over document age. The blend weights are configurable but must
//! sum to 1.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use triagent_core::{clamp_unit, Document, ExpertiseLevel, UserProfile};

use crate::text::keywords;

/// Blend weights for the final score. Default 0.6 / 0.3 / 0.1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RerankWeights {
    pub semantic: f32,
    pub contextual: f32,
    pub freshness: f32,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            semantic: 0.6,
            contextual: 0.3,
            freshness: 0.1,
        }
    }
}

impl RerankWeights {
    /// Weights are only usable when they form a convex combination.
    pub fn is_valid(&self) -> bool {
        let sum = self.semantic + self.contextual + self.freshness;
        (sum - 1.0).abs() <= 1e-3
            && self.semantic >= 0.0
            && self.contextual >= 0.0
            && self.freshness >= 0.0
    }
}

/// An external semantic scoring model (e.g., a cross-encoder service).
/// When present, it replaces the lexical semantic heuristic entirely.
#[async_trait]
pub trait SemanticModel: Send + Sync {
    async fn score(&self, query: &str, content: &str) -> f32;
}

/// A document with its rerank breakdown. Derived, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankedDocument {
    pub document: Document,
    pub original_score: f32,
    pub semantic_score: f32,
    pub contextual_score: f32,
    pub freshness_score: f32,
    pub final_score: f32,
    pub rationale: String,
}

/// Synonym pairs recognized by the lexical semantic heuristic.
fn default_synonyms() -> Vec<(String, String)> {
    [
        ("login", "authentication"),
        ("setup", "configuration"),
        ("error", "issue"),
        ("api", "endpoint"),
        ("token", "credential"),
        ("delete", "remove"),
        ("upgrade", "update"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect()
}

pub struct Reranker {
    weights: RerankWeights,
    synonyms: Vec<(String, String)>,
    model: Option<Arc<dyn SemanticModel>>,
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new(RerankWeights::default())
    }
}

impl Reranker {
    pub fn new(weights: RerankWeights) -> Self {
        Self {
            weights,
            synonyms: default_synonyms(),
            model: None,
        }
    }

    pub fn with_synonyms(mut self, synonyms: Vec<(String, String)>) -> Self {
        self.synonyms = synonyms;
        self
    }

    /// Delegate semantic scoring to an external model.
    pub fn with_semantic_model(mut self, model: Arc<dyn SemanticModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// The weighted blend, clamped to [0, 1].
    pub fn blend(&self, semantic: f32, contextual: f32, freshness: f32) -> f32 {
        clamp_unit(
            self.weights.semantic * semantic
                + self.weights.contextual * contextual
                + self.weights.freshness * freshness,
        )
    }

    /// Rerank documents against a query and profile; sorted by final score
    /// descending, truncated to `top_k`.
    pub async fn rerank(
        &self,
        query: &str,
        documents: Vec<Document>,
        profile: &UserProfile,
        top_k: usize,
    ) -> Vec<RerankedDocument> {
        let mut reranked = Vec::with_capacity(documents.len());
        for document in documents {
            let semantic = match &self.model {
                Some(model) => clamp_unit(model.score(query, &document.content).await),
                None => self.semantic_score(query, &document.content),
            };
            let contextual = self.contextual_score(&document, profile);
            let freshness = freshness_score(&document);
            let final_score = self.blend(semantic, contextual, freshness);
            let rationale = format!(
                "semantic {semantic:.2} · contextual {contextual:.2} · freshness {freshness:.2}"
            );
            reranked.push(RerankedDocument {
                original_score: document.score,
                document,
                semantic_score: semantic,
                contextual_score: contextual,
                freshness_score: freshness,
                final_score,
                rationale,
            });
        }
        reranked.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        reranked.truncate(top_k);
        tracing::debug!(query, kept = reranked.len(), "reranked documents");
        reranked
    }

    /// Lexical semantic relevance: keyword overlap, bigram phrase hits,
    /// exact substring and synonym bonuses.
    fn semantic_score(&self, query: &str, content: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let content_lower = content.to_lowercase();
        let query_keywords = keywords(query);

        let mut score = if query_keywords.is_empty() {
            0.5
        } else {
            let matched = query_keywords
                .iter()
                .filter(|k| content_lower.contains(k.as_str()))
                .count();
            matched as f32 / query_keywords.len() as f32
        };

        // consecutive word pairs from the query found verbatim
        let words: Vec<&str> = query_lower.split_whitespace().collect();
        let mut phrase_bonus: f32 = 0.0;
        for pair in words.windows(2) {
            let phrase = format!("{} {}", pair[0], pair[1]);
            if content_lower.contains(&phrase) {
                phrase_bonus += 0.05;
            }
        }
        score += phrase_bonus.min(0.15);

        if query.len() > 10 && content_lower.contains(&query_lower) {
            score += 0.2;
        }

        let mut synonym_bonus: f32 = 0.0;
        for (a, b) in &self.synonyms {
            let forward = query_lower.contains(a.as_str()) && content_lower.contains(b.as_str());
            let backward = query_lower.contains(b.as_str()) && content_lower.contains(a.as_str());
            if forward || backward {
                synonym_bonus += 0.1;
            }
        }
        score += synonym_bonus.min(0.2);

        clamp_unit(score)
    }

    /// Profile-driven bonuses, summed and clamped to [0, 1].
    fn contextual_score(&self, document: &Document, profile: &UserProfile) -> f32 {
        let content_lower = document.content.to_lowercase();
        let category = document
            .metadata
            .category
            .as_deref()
            .unwrap_or("")
            .to_lowercase();
        let mut score = 0.0;

        // expertise vs document category
        score += match profile.expertise {
            ExpertiseLevel::Advanced if category == "reference" || category == "advanced" => 0.2,
            ExpertiseLevel::Beginner if category == "guide" || category == "getting-started" => 0.2,
            ExpertiseLevel::Beginner if category == "reference" || category == "advanced" => -0.1,
            ExpertiseLevel::Intermediate if category == "guide" => 0.1,
            _ => 0.0,
        };

        // technical background keyword overlap
        let background_hits = profile
            .technical_background
            .iter()
            .filter(|t| content_lower.contains(t.to_lowercase().as_str()))
            .count();
        score += (0.05 * background_hits as f32).min(0.2);

        // preferred language match
        if let (Some(wanted), Some(actual)) =
            (&profile.preferred_language, &document.metadata.language)
            && wanted.eq_ignore_ascii_case(actual)
        {
            score += 0.1;
        }

        // recent conversation topics
        let topic_hits = profile
            .recent_topics
            .iter()
            .filter(|t| content_lower.contains(t.to_lowercase().as_str()))
            .count();
        score += (0.05 * topic_hits as f32).min(0.15);

        score += authority_bonus(&document.source, &category);

        clamp_unit(score)
    }
}

/// Source authority: official material ranks up, community content slightly
/// down.
fn authority_bonus(source: &str, category: &str) -> f32 {
    let source_lower = source.to_lowercase();
    if source_lower.contains("official") {
        0.15
    } else if source_lower.contains("docs") || category == "reference" {
        0.1
    } else if source_lower.contains("forum")
        || source_lower.contains("community")
        || source_lower.contains("blog")
    {
        -0.05
    } else {
        0.0
    }
}

/// Step function over document age; unknown age scores neutral.
fn freshness_score(document: &Document) -> f32 {
    let Some(updated) = document.metadata.last_updated else {
        return 0.5;
    };
    let age_days = (Utc::now() - updated).num_days();
    match age_days {
        d if d <= 30 => 1.0,
        d if d <= 90 => 0.8,
        d if d <= 180 => 0.6,
        d if d <= 365 => 0.4,
        _ => 0.2,
    }
}

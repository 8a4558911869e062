//! Retrieval service abstraction and the document model.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Metadata attached to a retrieved document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source category (e.g., "guide", "reference", "troubleshooting")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Document language code (e.g., "en")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// When the document was last updated (drives freshness scoring)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// A retrieved document (or chunk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Backend-assigned identifier, if the backend has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub content: String,

    /// Where this document came from (e.g., "official-docs", "community-forum")
    pub source: String,

    /// Retrieval relevance, normalized into [0, 1]
    pub score: f32,

    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Key for de-duplicating documents across refinement iterations:
    /// the backend id when present, otherwise source plus a content prefix.
    pub fn dedup_key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => {
                let prefix: String = self.content.chars().take(100).collect();
                format!("{}::{prefix}", self.source)
            }
        }
    }
}

/// Optional constraints on a search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Restrict to one source category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Restrict to one source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl SearchFilters {
    pub fn none() -> Self {
        Self::default()
    }
}

/// The knowledge retrieval service.
///
/// A search failure is an ordinary failure: the refinement loop treats it as
/// an empty result set for that pass and keeps going.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Return up to `top_k` documents relevant to `query`.
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> std::result::Result<Vec<Document>, RetrievalError>;
}

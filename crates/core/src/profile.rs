//! User profile — the context signals the reranker personalizes against.

use serde::{Deserialize, Serialize};

/// Self-reported or inferred user expertise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertiseLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

/// What we know about the user asking the question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub expertise: ExpertiseLevel,

    /// Technologies the user works with (e.g., "kubernetes", "postgres")
    #[serde(default)]
    pub technical_background: Vec<String>,

    /// Preferred document language code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,

    /// Topics from recent conversation turns
    #[serde(default)]
    pub recent_topics: Vec<String>,
}

impl UserProfile {
    pub fn with_expertise(mut self, expertise: ExpertiseLevel) -> Self {
        self.expertise = expertise;
        self
    }

    pub fn with_background(mut self, background: Vec<String>) -> Self {
        self.technical_background = background;
        self
    }

    pub fn with_recent_topics(mut self, topics: Vec<String>) -> Self {
        self.recent_topics = topics;
        self
    }
}

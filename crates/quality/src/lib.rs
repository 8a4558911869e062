//! Advisory quality gate for drafted responses.
//!
//! Before a high-confidence answer is delivered, [`QualityValidator`] scores
//! it on six weighted dimensions (completeness, accuracy, relevance, clarity,
//! tone, security) using deterministic string heuristics; there is no model
//! call on this path. The resulting [`ValidationReport`] travels with the
//! task diagnostics so operators can see why an answer scored the way it
//! did. The gate never blocks delivery and never errors: if scoring itself
//! breaks it fails open with a passing report.

pub mod model;
pub mod validator;

pub use model::{Dimension, DimensionScores, Issue, Severity, ValidationReport};
pub use validator::{DEFAULT_MIN_QUALITY_SCORE, QualityValidator};

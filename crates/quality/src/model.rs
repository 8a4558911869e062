//! Report types produced by the quality gate.

use serde::{Deserialize, Serialize};

/// One of the six axes a response is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Completeness,
    Accuracy,
    Relevance,
    Clarity,
    Tone,
    Security,
}

impl Dimension {
    /// Every dimension, in weight order.
    pub const ALL: [Dimension; 6] = [
        Dimension::Completeness,
        Dimension::Accuracy,
        Dimension::Relevance,
        Dimension::Clarity,
        Dimension::Tone,
        Dimension::Security,
    ];

    /// Fixed weight of this dimension in the overall score. Weights sum to 1.
    pub fn weight(self) -> f32 {
        match self {
            Dimension::Completeness => 0.25,
            Dimension::Accuracy => 0.25,
            Dimension::Relevance => 0.20,
            Dimension::Clarity => 0.15,
            Dimension::Tone => 0.10,
            Dimension::Security => 0.05,
        }
    }
}

/// How serious a flagged issue is. A critical issue fails the response
/// outright regardless of its numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A single problem spotted during validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Which axis the problem belongs to.
    pub dimension: Dimension,
    /// How bad it is.
    pub severity: Severity,
    /// Human-readable description of what was found.
    pub message: String,
}

impl Issue {
    pub fn new(dimension: Dimension, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            dimension,
            severity,
            message: message.into(),
        }
    }
}

/// Per-dimension scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    pub completeness: f32,
    pub accuracy: f32,
    pub relevance: f32,
    pub clarity: f32,
    pub tone: f32,
    pub security: f32,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> f32 {
        match dimension {
            Dimension::Completeness => self.completeness,
            Dimension::Accuracy => self.accuracy,
            Dimension::Relevance => self.relevance,
            Dimension::Clarity => self.clarity,
            Dimension::Tone => self.tone,
            Dimension::Security => self.security,
        }
    }

    /// Weighted sum across all six dimensions.
    pub fn weighted_overall(&self) -> f32 {
        Dimension::ALL
            .iter()
            .map(|d| d.weight() * self.get(*d))
            .sum()
    }
}

/// Outcome of validating one response. Attached to task diagnostics; the
/// gate is advisory and never blocks delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the response cleared the score threshold with no critical issue.
    pub passed: bool,
    /// Weighted overall score in `[0, 1]`.
    pub quality_score: f32,
    /// The per-dimension breakdown behind the overall score.
    pub scores: DimensionScores,
    /// Problems found, worst ones first only by accident of check order.
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Concrete rewording advice tied to the issues above.
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// True when scoring itself failed and the gate defaulted to passing.
    #[serde(default)]
    pub fail_open: bool,
}

impl ValidationReport {
    pub fn has_critical(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Critical)
    }
}

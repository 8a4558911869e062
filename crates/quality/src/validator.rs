//! Heuristic scoring of a drafted response before it leaves the agent.
//!
//! Six independent checks each return a score in `[0, 1]`; the weighted sum
//! decides `passed` together with a critical-issue veto. Every check is plain
//! string matching so validation stays deterministic and offline. If scoring
//! itself panics the gate fails open rather than blocking the answer.

use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;
use triagent_core::clamp_unit;

use crate::model::{Dimension, DimensionScores, Issue, Severity, ValidationReport};

/// Overall score a response must reach to pass.
pub const DEFAULT_MIN_QUALITY_SCORE: f32 = 0.7;

/// Score reported when the gate fails open.
const FAIL_OPEN_SCORE: f32 = 0.7;

/// Responses shorter than this are flagged as likely incomplete.
const MIN_ANSWER_CHARS: usize = 40;

/// Sentences past this many words hurt the clarity score.
const LONG_SENTENCE_WORDS: usize = 60;

/// Accuracy score when there are no sources to check against.
const NEUTRAL_ACCURACY: f32 = 0.6;

const SUPPORTIVE_MARKERS: [&str; 7] = [
    "please",
    "you can",
    "let me know",
    "happy to",
    "feel free",
    "hope this helps",
    "glad to",
];

const DISMISSIVE_MARKERS: [&str; 6] = [
    "obviously",
    "just google",
    "as anyone knows",
    "stupid",
    "dumb",
    "figure it out",
];

const SECURITY_MARKERS: [&str; 9] = [
    "password is",
    "api key:",
    "sk-",
    "secret key",
    "private key",
    "token:",
    "curl | sh",
    "rm -rf",
    "disable your firewall",
];

/// Scores a response against the query and the evidence it was drawn from.
#[derive(Debug, Clone, Copy)]
pub struct QualityValidator {
    min_quality_score: f32,
}

impl Default for QualityValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityValidator {
    pub fn new() -> Self {
        Self {
            min_quality_score: DEFAULT_MIN_QUALITY_SCORE,
        }
    }

    pub fn with_min_score(mut self, min_quality_score: f32) -> Self {
        self.min_quality_score = clamp_unit(min_quality_score);
        self
    }

    /// Scores `response` for the given `query`. `sources` are the observation
    /// summaries the answer was drawn from and back the accuracy check.
    ///
    /// Never fails: a panic anywhere in scoring degrades to a passing
    /// fail-open report.
    pub fn validate(&self, query: &str, response: &str, sources: &[String]) -> ValidationReport {
        let min = self.min_quality_score;
        match catch_unwind(AssertUnwindSafe(|| {
            score_response(query, response, sources, min)
        })) {
            Ok(report) => report,
            Err(_) => {
                warn!("quality scoring panicked; failing open");
                fail_open_report()
            }
        }
    }
}

fn score_response(
    query: &str,
    response: &str,
    sources: &[String],
    min_quality_score: f32,
) -> ValidationReport {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    let scores = DimensionScores {
        completeness: check_completeness(query, response, &mut issues, &mut suggestions),
        accuracy: check_accuracy(response, sources, &mut issues, &mut suggestions),
        relevance: check_relevance(query, response, &mut issues, &mut suggestions),
        clarity: check_clarity(response, &mut issues, &mut suggestions),
        tone: check_tone(response, &mut issues, &mut suggestions),
        security: check_security(response, &mut issues, &mut suggestions),
    };

    let quality_score = scores.weighted_overall();
    let has_critical = issues
        .iter()
        .any(|issue| issue.severity == Severity::Critical);

    ValidationReport {
        passed: quality_score >= min_quality_score && !has_critical,
        quality_score,
        scores,
        issues,
        suggestions,
        fail_open: false,
    }
}

pub(crate) fn fail_open_report() -> ValidationReport {
    ValidationReport {
        passed: true,
        quality_score: FAIL_OPEN_SCORE,
        scores: DimensionScores::default(),
        issues: Vec::new(),
        suggestions: Vec::new(),
        fail_open: true,
    }
}

/// How much of the query's vocabulary the response covers, with a penalty
/// for answers too short to have covered anything.
fn check_completeness(
    query: &str,
    response: &str,
    issues: &mut Vec<Issue>,
    suggestions: &mut Vec<String>,
) -> f32 {
    let query_terms = keywords(query);
    let response_terms = keywords(response);

    let mut score = if query_terms.is_empty() {
        1.0
    } else {
        let covered = query_terms
            .iter()
            .filter(|term| response_terms.contains(*term))
            .count();
        covered as f32 / query_terms.len() as f32
    };

    if response.chars().count() < MIN_ANSWER_CHARS {
        score = score.min(0.5);
        issues.push(Issue::new(
            Dimension::Completeness,
            Severity::Warning,
            "response is too short to cover the question",
        ));
    }
    if score < 0.5 {
        issues.push(Issue::new(
            Dimension::Completeness,
            Severity::Warning,
            "response leaves parts of the question unaddressed",
        ));
        suggestions.push("Address every part of the question.".into());
    }
    score
}

/// Fraction of substantial sentences that at least one source backs up.
/// A sentence counts as backed when a source contains two of its keywords.
fn check_accuracy(
    response: &str,
    sources: &[String],
    issues: &mut Vec<Issue>,
    suggestions: &mut Vec<String>,
) -> f32 {
    if sources.is_empty() {
        issues.push(Issue::new(
            Dimension::Accuracy,
            Severity::Info,
            "no sources available to check statements against",
        ));
        return NEUTRAL_ACCURACY;
    }

    let lowered: Vec<String> = sources.iter().map(|s| s.to_lowercase()).collect();
    let claims: Vec<&str> = sentences(response)
        .into_iter()
        .filter(|s| s.chars().count() > 20)
        .collect();
    if claims.is_empty() {
        return 1.0;
    }

    let supported = claims
        .iter()
        .filter(|claim| {
            let terms = keywords(claim);
            lowered.iter().any(|source| {
                terms
                    .iter()
                    .filter(|term| source.contains(term.as_str()))
                    .count()
                    >= 2
            })
        })
        .count();

    if supported * 2 < claims.len() {
        issues.push(Issue::new(
            Dimension::Accuracy,
            Severity::Warning,
            "most statements lack support in the gathered sources",
        ));
        suggestions.push("Ground statements in the retrieved sources.".into());
    }
    supported as f32 / claims.len() as f32
}

/// Keyword overlap normalized by the response's own vocabulary, so padded
/// off-topic answers score low even when they brush the right terms.
fn check_relevance(
    query: &str,
    response: &str,
    issues: &mut Vec<Issue>,
    suggestions: &mut Vec<String>,
) -> f32 {
    let query_terms = keywords(query);
    let response_terms = keywords(response);

    if query_terms.is_empty() {
        return 1.0;
    }
    if response_terms.is_empty() {
        issues.push(Issue::new(
            Dimension::Relevance,
            Severity::Warning,
            "response has no topical content",
        ));
        return 0.0;
    }

    let overlap = query_terms.intersection(&response_terms).count() as f32;
    let score = clamp_unit(3.0 * overlap / response_terms.len() as f32);
    if score < 0.3 {
        issues.push(Issue::new(
            Dimension::Relevance,
            Severity::Warning,
            "response drifts away from the question",
        ));
        suggestions.push("Keep the answer focused on the question asked.".into());
    }
    score
}

/// Average sentence length, degrading once sentences get hard to follow.
fn check_clarity(response: &str, issues: &mut Vec<Issue>, suggestions: &mut Vec<String>) -> f32 {
    let parts = sentences(response);
    if parts.is_empty() {
        issues.push(Issue::new(
            Dimension::Clarity,
            Severity::Warning,
            "response is empty",
        ));
        return 0.0;
    }

    let counts: Vec<usize> = parts.iter().map(|s| s.split_whitespace().count()).collect();
    if counts.iter().any(|&words| words > LONG_SENTENCE_WORDS) {
        issues.push(Issue::new(
            Dimension::Clarity,
            Severity::Warning,
            "a sentence runs past sixty words",
        ));
        suggestions.push("Break long sentences up.".into());
    }

    let avg = counts.iter().sum::<usize>() as f32 / counts.len() as f32;
    if avg <= 25.0 {
        1.0
    } else {
        (1.0 - (avg - 25.0) * 0.035).clamp(0.3, 1.0)
    }
}

/// Supportive phrasing raises the score, dismissive phrasing sinks it.
fn check_tone(response: &str, issues: &mut Vec<Issue>, suggestions: &mut Vec<String>) -> f32 {
    let lower = response.to_lowercase();
    let supportive = SUPPORTIVE_MARKERS
        .into_iter()
        .filter(|marker| lower.contains(*marker))
        .count()
        .min(3);
    let dismissive = DISMISSIVE_MARKERS
        .into_iter()
        .filter(|marker| lower.contains(*marker))
        .count();

    if dismissive > 0 {
        issues.push(Issue::new(
            Dimension::Tone,
            Severity::Warning,
            "dismissive phrasing detected",
        ));
        suggestions.push("Keep the tone supportive and professional.".into());
    }
    clamp_unit(0.7 + 0.1 * supportive as f32 - 0.3 * dismissive as f32)
}

/// Scans for credential and unsafe-instruction markers. Any hit is critical
/// and vetoes the response regardless of the other scores.
fn check_security(response: &str, issues: &mut Vec<Issue>, suggestions: &mut Vec<String>) -> f32 {
    let lower = response.to_lowercase();
    let hits: Vec<&str> = SECURITY_MARKERS
        .into_iter()
        .filter(|marker| lower.contains(*marker))
        .collect();

    if hits.is_empty() {
        return 1.0;
    }
    issues.push(Issue::new(
        Dimension::Security,
        Severity::Critical,
        format!("possibly sensitive or unsafe content: {}", hits.join(", ")),
    ));
    suggestions.push("Remove credentials and unsafe instructions.".into());
    0.0
}

fn keywords(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() > 3)
        .map(String::from)
        .collect()
}

fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

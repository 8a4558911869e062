//! Adequacy scoring — do the retrieved documents answer the question?
//!
//! The score is always judged against the *original* query, not the refined
//! one, so refinement cannot drift the goalposts. Gap detection is ordered;
//! the first gap drives the next refined query.

use serde::{Deserialize, Serialize};
use triagent_core::{clamp_unit, Document};

use crate::text::keywords;

/// How many leading documents the source-diversity check inspects.
const DIVERSITY_WINDOW: usize = 3;

/// What kind of information is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    NotEnoughDocuments,
    NarrowSourceCoverage,
    MissingKeywords,
}

/// One detected information gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InformationGap {
    pub kind: GapKind,
    pub detail: String,

    /// For `MissingKeywords`, the query terms no document mentions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// The outcome of one adequacy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdequacyReport {
    /// [0, 1]; higher means the documents suffice
    pub score: f32,

    /// Ordered; the first gap is the one refinement addresses
    pub gaps: Vec<InformationGap>,
}

/// Score document adequacy for the original query.
///
/// `avg_relevance` is the mean rerank score of the documents (mean raw
/// retrieval score when reranking is disabled). `iteration` is 1-based;
/// later iterations pay a small penalty so the loop cannot idle forever on
/// mediocre results.
pub fn evaluate(
    original_query: &str,
    documents: &[Document],
    avg_relevance: f32,
    iteration: u32,
) -> AdequacyReport {
    let count_term = (documents.len() as f32 / 3.0).min(1.0);
    let penalty = 0.1 * iteration.saturating_sub(1) as f32;
    let score = clamp_unit(count_term + 0.3 * avg_relevance - penalty);

    let mut gaps = Vec::new();

    if documents.len() < 2 {
        gaps.push(InformationGap {
            kind: GapKind::NotEnoughDocuments,
            detail: format!("only {} document(s) retrieved", documents.len()),
            keywords: Vec::new(),
        });
    }

    // source diversity over the leading documents; a document without a
    // category counts under its source instead
    let mut categories: Vec<String> = Vec::new();
    for doc in documents.iter().take(DIVERSITY_WINDOW) {
        let category = doc
            .metadata
            .category
            .clone()
            .unwrap_or_else(|| doc.source.clone());
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    if !documents.is_empty() && categories.len() < 2 {
        gaps.push(InformationGap {
            kind: GapKind::NarrowSourceCoverage,
            detail: format!("top documents span only {} source category", categories.len()),
            keywords: Vec::new(),
        });
    }

    let combined: String = documents
        .iter()
        .map(|d| d.content.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let missing: Vec<String> = keywords(original_query)
        .into_iter()
        .filter(|k| !combined.contains(k.as_str()))
        .collect();
    if !missing.is_empty() {
        gaps.push(InformationGap {
            kind: GapKind::MissingKeywords,
            detail: format!("no document mentions: {}", missing.join(", ")),
            keywords: missing,
        });
    }

    AdequacyReport { score, gaps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triagent_core::DocumentMetadata;

    fn doc(content: &str, source: &str, category: Option<&str>) -> Document {
        Document {
            id: None,
            content: content.into(),
            source: source.into(),
            score: 0.8,
            metadata: DocumentMetadata {
                category: category.map(String::from),
                language: None,
                last_updated: None,
            },
        }
    }

    #[test]
    fn strong_results_score_high_with_no_gaps() {
        let docs = vec![
            doc("Configure OAuth2 redirect URIs in the console.", "official-docs", Some("guide")),
            doc("OAuth2 token exchange reference.", "official-docs", Some("reference")),
            doc("Troubleshooting OAuth2: configure scopes correctly.", "forum", Some("troubleshooting")),
        ];
        let report = evaluate("configure oauth2", &docs, 0.9, 1);
        // 3/3 docs + 0.3*0.9, no penalty on the first pass
        assert!(report.score > 0.9);
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn empty_results_score_zero_and_flag_count_gap() {
        let report = evaluate("configure oauth2", &[], 0.0, 1);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.gaps[0].kind, GapKind::NotEnoughDocuments);
    }

    #[test]
    fn later_iterations_pay_a_penalty() {
        let docs = vec![
            doc("oauth2 configure a", "s1", Some("guide")),
            doc("oauth2 configure b", "s2", Some("reference")),
        ];
        let first = evaluate("configure oauth2", &docs, 0.5, 1).score;
        let third = evaluate("configure oauth2", &docs, 0.5, 3).score;
        assert!((first - third - 0.2).abs() < 1e-6);
    }

    #[test]
    fn single_category_flags_narrow_coverage() {
        let docs = vec![
            doc("webhook retries one", "kb", Some("guide")),
            doc("webhook retries two", "kb", Some("guide")),
            doc("webhook retries three", "kb", Some("guide")),
        ];
        let report = evaluate("webhook retries", &docs, 0.5, 1);
        assert!(report
            .gaps
            .iter()
            .any(|g| g.kind == GapKind::NarrowSourceCoverage));
    }

    #[test]
    fn missing_category_falls_back_to_source() {
        let docs = vec![
            doc("webhook retries one", "official-docs", None),
            doc("webhook retries two", "community-forum", None),
        ];
        let report = evaluate("webhook retries", &docs, 0.5, 1);
        // two distinct sources, so coverage is fine
        assert!(!report
            .gaps
            .iter()
            .any(|g| g.kind == GapKind::NarrowSourceCoverage));
    }

    #[test]
    fn uncovered_keywords_are_reported() {
        let docs = vec![
            doc("General webhook overview.", "docs", Some("guide")),
            doc("Delivery settings panel.", "docs", Some("reference")),
        ];
        let report = evaluate("webhook signature rotation", &docs, 0.5, 1);
        let gap = report
            .gaps
            .iter()
            .find(|g| g.kind == GapKind::MissingKeywords)
            .expect("keyword gap");
        assert!(gap.keywords.contains(&"signature".to_string()));
        assert!(gap.keywords.contains(&"rotation".to_string()));
        assert!(!gap.keywords.contains(&"webhook".to_string()));
    }

    #[test]
    fn gap_order_is_count_then_coverage_then_keywords() {
        let docs = vec![doc("unrelated text", "kb", Some("guide"))];
        let report = evaluate("webhook signature", &docs, 0.1, 1);
        let kinds: Vec<GapKind> = report.gaps.iter().map(|g| g.kind).collect();
        assert_eq!(
            kinds,
            vec![
                GapKind::NotEnoughDocuments,
                GapKind::NarrowSourceCoverage,
                GapKind::MissingKeywords
            ]
        );
    }
}

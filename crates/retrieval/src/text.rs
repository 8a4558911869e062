//! Small text utilities shared by the decomposer, reranker, and adequacy
//! scorer. Nothing clever — lowercase tokens, sentence splits, keyword
//! filtering.

/// Words too common to count as content keywords.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "because", "been", "before", "being", "between", "both",
    "could", "does", "doing", "down", "during", "each", "from", "have", "having", "here", "into",
    "just", "more", "most", "much", "need", "only", "other", "over", "please", "same", "should",
    "some", "such", "than", "that", "their", "them", "then", "there", "these", "they", "this",
    "through", "under", "very", "want", "what", "when", "where", "which", "while", "will", "with",
    "would", "your",
];

/// Strip punctuation from a token's edges and lowercase it.
pub(crate) fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Content keywords of a text: normalized tokens longer than 3 chars,
/// minus stopwords, de-duplicated in first-seen order.
pub(crate) fn keywords(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for token in text.split_whitespace() {
        let normalized = normalize_token(token);
        if normalized.len() > 3
            && !STOPWORDS.contains(&normalized.as_str())
            && !seen.contains(&normalized)
        {
            seen.push(normalized);
        }
    }
    seen
}

/// Split text into sentences on `.`, `?`, and `!`, dropping empty pieces.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '?', '!'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

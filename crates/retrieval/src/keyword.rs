//! Keyword retriever over an in-memory corpus.
//!
//! Lexical scoring only: keyword coverage plus occurrence density. Good
//! enough for demos, tests, and small knowledge bases; production setups
//! plug in their own [`Retriever`] backend.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use triagent_core::{
    clamp_unit, Document, DocumentMetadata, RetrievalError, Retriever, SearchFilters,
};

use crate::text::keywords;

pub struct KeywordRetriever {
    documents: Vec<Document>,
}

impl KeywordRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// A retriever preloaded with the built-in support corpus.
    pub fn demo() -> Self {
        Self::new(demo_corpus())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        let query_lower = query.to_lowercase();
        let query_keywords = keywords(query);

        let mut results: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| passes_filters(d, filters))
            .filter_map(|d| {
                let score = relevance(&d.content.to_lowercase(), &query_keywords, &query_lower);
                (score > 0.0).then(|| {
                    let mut scored = d.clone();
                    scored.score = score;
                    scored
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::debug!(query, hits = results.len(), "keyword search");
        Ok(results)
    }
}

fn passes_filters(document: &Document, filters: &SearchFilters) -> bool {
    if let Some(category) = &filters.category {
        let doc_category = document.metadata.category.as_deref().unwrap_or("");
        if !doc_category.eq_ignore_ascii_case(category) {
            return false;
        }
    }
    if let Some(source) = &filters.source
        && !document.source.eq_ignore_ascii_case(source)
    {
        return false;
    }
    true
}

/// Keyword coverage weighted against occurrence density. Zero when nothing
/// matches; a keyword-free query falls back to whole-phrase matching.
fn relevance(content_lower: &str, query_keywords: &[String], query_lower: &str) -> f32 {
    if query_keywords.is_empty() {
        return if content_lower.contains(query_lower) {
            0.5
        } else {
            0.0
        };
    }

    let mut matched = 0usize;
    let mut occurrences = 0usize;
    for keyword in query_keywords {
        let hits = content_lower.matches(keyword.as_str()).count();
        if hits > 0 {
            matched += 1;
        }
        occurrences += hits;
    }
    if matched == 0 {
        return 0.0;
    }

    let coverage = matched as f32 / query_keywords.len() as f32;
    let density =
        (occurrences as f32 / (content_lower.len() as f32 / 100.0).max(1.0)).min(1.0);
    clamp_unit(0.7 * coverage + 0.3 * density)
}

fn entry(
    id: &str,
    source: &str,
    category: &str,
    age_days: i64,
    content: &str,
) -> Document {
    Document {
        id: Some(id.to_string()),
        content: content.to_string(),
        source: source.to_string(),
        score: 0.0,
        metadata: DocumentMetadata {
            category: Some(category.to_string()),
            language: Some("en".to_string()),
            last_updated: Some(Utc::now() - Duration::days(age_days)),
        },
    }
}

/// The built-in support knowledge base used by the demo CLI and tests.
pub fn demo_corpus() -> Vec<Document> {
    vec![
        entry(
            "oauth2-redirect",
            "official-docs",
            "guide",
            20,
            "To configure OAuth2, register your application and add every redirect \
             URI to the allowlist. Redirect URIs must match exactly, including \
             scheme and trailing slashes. Wildcards are not supported.",
        ),
        entry(
            "oauth2-scopes",
            "official-docs",
            "reference",
            45,
            "OAuth2 scope reference: read:tickets grants read access to support \
             tickets, write:tickets allows updates, admin:org covers organization \
             management. Request the narrowest scopes your integration needs.",
        ),
        entry(
            "oauth2-errors",
            "docs-portal",
            "troubleshooting",
            12,
            "invalid_grant during the OAuth2 token exchange usually means the \
             authorization code expired or the redirect URI differs from the one \
             used in the authorize step. Codes are single-use and expire after \
             ten minutes.",
        ),
        entry(
            "saml-sso",
            "official-docs",
            "guide",
            90,
            "Setting up SAML single sign-on: upload your identity provider \
             metadata, map the email attribute, and enable just-in-time \
             provisioning. Test with a sandbox user before enforcing SSO \
             for the whole organization.",
        ),
        entry(
            "webhook-retries",
            "docs-portal",
            "guide",
            30,
            "Webhook deliveries are retried with exponential backoff for up to \
             24 hours. A delivery counts as failed when your endpoint returns a \
             non-2xx status or times out after 10 seconds. Configure retry \
             settings per endpoint in the dashboard.",
        ),
        entry(
            "webhook-signature",
            "official-docs",
            "reference",
            60,
            "Every webhook request carries an HMAC signature in the \
             X-Signature header. Verify it by computing the digest of the raw \
             body with your signing secret. Reject requests older than five \
             minutes to prevent replay.",
        ),
        entry(
            "billing-cycle",
            "kb",
            "faq",
            150,
            "Billing runs on the first day of each month. Invoices are emailed \
             to the billing contact and available under Settings. Plan upgrades \
             are prorated; downgrades apply at the next cycle.",
        ),
        entry(
            "password-reset",
            "kb",
            "guide",
            75,
            "To reset your password, use the Forgot password link on the login \
             page. Reset emails expire after one hour. If the email never \
             arrives, check your spam folder or ask an admin to trigger a reset \
             from the account panel.",
        ),
        entry(
            "api-rate-limits",
            "official-docs",
            "reference",
            40,
            "API rate limits: 600 requests per minute per token. The response \
             headers X-RateLimit-Remaining and X-RateLimit-Reset describe your \
             budget. A 429 status means you should back off until the reset \
             time.",
        ),
        entry(
            "status-incidents",
            "community-forum",
            "troubleshooting",
            5,
            "When the API misbehaves, check the public status page before \
             filing a ticket. Incident history and maintenance windows are \
             listed there. Subscribe to updates to get notified about \
             degraded service.",
        ),
    ]
}

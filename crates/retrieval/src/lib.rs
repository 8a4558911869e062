//! Retrieval for triagent: query decomposition, reranking, adequacy
//! scoring, and the bounded retrieval-refinement loop.
//!
//! The pipeline reads left to right: [`decompose`] breaks a complex query
//! into sub-queries, [`refine`] drives the retrieve → rerank → evaluate
//! loop per query, [`rerank`] orders candidates against the user profile,
//! and [`adequacy`] decides whether the evidence is good enough to stop.
//! [`keyword`] provides the in-memory lexical backend used by demos and
//! tests.

pub mod adequacy;
pub mod decompose;
pub mod keyword;
pub mod refine;
pub mod rerank;

pub(crate) mod text;

pub use adequacy::{AdequacyReport, GapKind, InformationGap};
pub use decompose::{DecomposedQuery, QueryDecomposer, QueryIntent, SearchStrategy};
pub use keyword::{KeywordRetriever, demo_corpus};
pub use refine::{
    DecomposedOutcome, RefinementConfig, RefinementEngine, RefinementOutcome, RetrievalIteration,
};
pub use rerank::{RerankWeights, RerankedDocument, Reranker, SemanticModel};

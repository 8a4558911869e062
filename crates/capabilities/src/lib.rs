//! Built-in capability implementations for triagent.
//!
//! Capabilities are the loop's hands: search the knowledge base, run a
//! deep research pass, look up a ticket, check component health. The ticket
//! and status capabilities are deterministic stubs so the whole loop can be
//! exercised end-to-end without backend access.

pub mod deep_research;
pub mod knowledge_search;
pub mod service_status;
pub mod ticket_lookup;

pub use deep_research::DeepResearchCapability;
pub use knowledge_search::KnowledgeSearchCapability;
pub use service_status::ServiceStatusCapability;
pub use ticket_lookup::TicketLookupCapability;

use std::sync::Arc;

use triagent_core::{CapabilityRegistry, Retriever};
use triagent_retrieval::{RefinementConfig, RerankWeights};

/// Create the default capability registry backed by the given retriever.
pub fn default_registry(
    retriever: Arc<dyn Retriever>,
    refinement: RefinementConfig,
) -> CapabilityRegistry {
    default_registry_with(retriever, refinement, RerankWeights::default())
}

/// Like [`default_registry`], with explicit rerank weights for the
/// deep-research engine.
pub fn default_registry_with(
    retriever: Arc<dyn Retriever>,
    refinement: RefinementConfig,
    weights: RerankWeights,
) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Box::new(
        KnowledgeSearchCapability::new(retriever.clone()).with_top_k(refinement.top_k),
    ));
    registry.register(Box::new(
        DeepResearchCapability::new(retriever, refinement).with_weights(weights),
    ));
    registry.register(Box::new(TicketLookupCapability));
    registry.register(Box::new(ServiceStatusCapability));
    registry
}

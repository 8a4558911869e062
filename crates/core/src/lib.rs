//! # Triagent Core
//!
//! Domain types, traits, and error definitions for the triagent bounded
//! agent loop. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the loop talks to is defined as a trait here. This
//! enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)
//!
//! The loop itself lives in `triagent-governor`; retrieval refinement in
//! `triagent-retrieval`; the quality gate in `triagent-quality`.

pub mod action;
pub mod capability;
pub mod checkpoint;
pub mod error;
pub mod plan;
pub mod profile;
pub mod provider;
pub mod retrieval;
pub mod task;

// Re-export key types at crate root for ergonomics
pub use action::{ActionRequest, Observation};
pub use capability::{
    Capability, CapabilityRegistry, CapabilitySpec, InvocationContext, InvocationResult,
};
pub use checkpoint::CheckpointStore;
pub use error::{
    CapabilityError, CheckpointError, Error, ProviderError, Result, RetrievalError,
};
pub use plan::{clamp_unit, Plan, ReflectionDecision, ReflectionOutcome};
pub use profile::{ExpertiseLevel, UserProfile};
pub use provider::{
    extract_json_object, DecisionParams, DecisionRequest, DecisionResponse, Provider, Usage,
};
pub use retrieval::{Document, DocumentMetadata, Retriever, SearchFilters};
pub use task::{
    Diagnostics, GovernorState, OutputKind, TaskId, TaskInput, TaskOutput, TaskSnapshot,
    DEFAULT_STEP_BUDGET,
};

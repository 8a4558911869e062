//! The bounded loop — triagent's governor and everything around it.
//!
//! One task moves through a **Plan → Execute → Reflect** cycle:
//!
//! 1. **Route** the tick through the ordered guards (budget, repetition,
//!    aggregate failure, pending work)
//! 2. **Plan** the next move with the model, over the allowed capabilities
//! 3. **Execute** every pending action through the six-stage executor
//! 4. **Reflect** on what came back; continue, answer, or clarify
//! 5. After a terminal state, the confidence router shapes the output into
//!    an answer, a clarification, or an escalation
//!
//! The loop continues until a terminal state is routed or the step budget
//! runs out; a snapshot is checkpointed after every tick.

pub mod align;
pub mod executor;
pub mod fingerprint;
pub mod governor;
pub mod pipeline;
pub mod planner;
pub mod reflect;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use align::{align_arguments, AlignmentOutcome, ALIAS_CANDIDATES};
pub use executor::Executor;
pub use fingerprint::fingerprint;
pub use governor::{route, Governor, PureFailurePolicy};
pub use pipeline::TaskRunner;
pub use planner::Planner;
pub use reflect::Reflector;
pub use router::{
    ConfidenceRouter, Route, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MAX_CLARIFICATION_ATTEMPTS,
};
pub use state::{CancelHandle, TaskState};

//! Capability trait — the abstraction over external actions.
//!
//! Capabilities are what let the loop act on the world: search the knowledge
//! base, look up a ticket, run a deep-research pass. Each one declares a JSON
//! Schema for its arguments; the executor validates and aligns arguments
//! against that schema before anything is invoked.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::CapabilityError;
use crate::task::TaskId;

/// Per-invocation context handed to a capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationContext {
    /// The task on whose behalf this invocation runs
    pub task_id: TaskId,

    /// Current plan-cycle step
    pub step: u32,

    /// Steps left before the budget forces termination
    pub remaining_steps: u32,
}

/// What a capability invocation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvocationResult {
    pub fn ok(payload: serde_json::Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// A capability description sent to the planning model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub name: String,
    pub description: String,

    /// JSON Schema for the arguments
    pub input_schema: serde_json::Value,
}

/// The core Capability trait.
///
/// Each capability (knowledge_search, ticket_lookup, deep_research, ...)
/// implements this trait and is registered in the `CapabilityRegistry`,
/// which the executor resolves against at invocation time.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The unique name of this capability (e.g., "knowledge_search").
    fn name(&self) -> &str;

    /// A description of what this capability does (sent to the planner).
    fn description(&self) -> &str;

    /// JSON Schema describing this capability's arguments.
    fn input_schema(&self) -> serde_json::Value;

    /// Invoke the capability with aligned arguments.
    async fn invoke(
        &self,
        arguments: serde_json::Value,
        ctx: &InvocationContext,
    ) -> std::result::Result<InvocationResult, CapabilityError>;

    /// Convert this capability into a spec for the planning prompt.
    fn to_spec(&self) -> CapabilitySpec {
        CapabilitySpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// A registry of available capabilities.
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Box<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Register a capability. Replaces any existing one with the same name.
    pub fn register(&mut self, capability: Box<dyn Capability>) {
        let name = capability.name().to_string();
        self.capabilities.insert(name, capability);
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<&dyn Capability> {
        self.capabilities.get(name).map(|c| c.as_ref())
    }

    /// The declared argument schema for a capability, if registered.
    pub fn schema(&self, name: &str) -> Option<serde_json::Value> {
        self.capabilities.get(name).map(|c| c.input_schema())
    }

    /// All capability specs (for the planning prompt).
    pub fn specs(&self) -> Vec<CapabilitySpec> {
        self.capabilities.values().map(|c| c.to_spec()).collect()
    }

    /// Invoke a registered capability.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
        ctx: &InvocationContext,
    ) -> std::result::Result<InvocationResult, CapabilityError> {
        let capability = self
            .capabilities
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound(name.to_string()))?;
        capability.invoke(arguments, ctx).await
    }

    /// List all registered capability names.
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A trivial capability for unit tests.
    struct EchoCapability;

    #[async_trait]
    impl Capability for EchoCapability {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn invoke(
            &self,
            arguments: serde_json::Value,
            _ctx: &InvocationContext,
        ) -> std::result::Result<InvocationResult, CapabilityError> {
            Ok(InvocationResult::ok(
                serde_json::json!({"echo": arguments["text"]}),
            ))
        }
    }

    fn test_ctx() -> InvocationContext {
        InvocationContext {
            task_id: TaskId::new(),
            step: 1,
            remaining_steps: 5,
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(EchoCapability));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert!(registry.schema("echo").is_some());
    }

    #[test]
    fn registry_specs() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(EchoCapability));
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
    }

    #[tokio::test]
    async fn registry_invoke() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(EchoCapability));
        let result = registry
            .invoke("echo", serde_json::json!({"text": "hello"}), &test_ctx())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.payload.unwrap()["echo"], "hello");
    }

    #[tokio::test]
    async fn registry_invoke_missing_capability() {
        let registry = CapabilityRegistry::new();
        let err = registry
            .invoke("nonexistent", serde_json::json!({}), &test_ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::NotFound(_)));
    }
}

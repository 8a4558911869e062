//! Shared test helpers for loop-stage tests.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;
use triagent_core::{
    Capability, CapabilityError, CheckpointError, CheckpointStore, DecisionRequest,
    DecisionResponse, GovernorState, InvocationContext, InvocationResult, Provider, ProviderError,
    TaskId, TaskSnapshot,
};

/// A provider that replays scripted raw outputs in order.
///
/// Panics if more decisions are requested than were scripted.
pub struct ScriptedDecider {
    outputs: Mutex<Vec<String>>,
    calls: Mutex<usize>,
}

impl ScriptedDecider {
    pub fn new(outputs: Vec<&str>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into_iter().map(String::from).collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedDecider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, _request: DecisionRequest) -> Result<DecisionResponse, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        let outputs = self.outputs.lock().unwrap();
        if *calls >= outputs.len() {
            panic!(
                "ScriptedDecider: no more outputs (call #{}, have {})",
                *calls,
                outputs.len()
            );
        }
        let content = outputs[*calls].clone();
        *calls += 1;
        Ok(DecisionResponse {
            content,
            model: "scripted-model".into(),
            usage: None,
        })
    }
}

/// A provider whose every call fails.
pub struct OfflineProvider;

#[async_trait]
impl Provider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    async fn decide(&self, _request: DecisionRequest) -> Result<DecisionResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// A search-shaped capability returning a fixed document list.
pub struct StubSearchCapability;

#[async_trait]
impl Capability for StubSearchCapability {
    fn name(&self) -> &str {
        "knowledge_search"
    }
    fn description(&self) -> &str {
        "Search the knowledge base"
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "top_k": { "type": "integer" }
            },
            "required": ["query"]
        })
    }
    async fn invoke(
        &self,
        _arguments: serde_json::Value,
        _ctx: &InvocationContext,
    ) -> Result<InvocationResult, CapabilityError> {
        Ok(InvocationResult::ok(json!([
            "Register redirect URIs in the console; exact match required.",
            "Authorization codes are single-use and expire after ten minutes."
        ])))
    }
}

/// A capability that always reports failure.
pub struct BrokenCapability;

#[async_trait]
impl Capability for BrokenCapability {
    fn name(&self) -> &str {
        "ticket_lookup"
    }
    fn description(&self) -> &str {
        "Look up a support ticket"
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "ticket_id": { "type": "string" } },
            "required": ["ticket_id"]
        })
    }
    async fn invoke(
        &self,
        _arguments: serde_json::Value,
        _ctx: &InvocationContext,
    ) -> Result<InvocationResult, CapabilityError> {
        Ok(InvocationResult::fail("ticket backend unreachable"))
    }
}

/// A checkpoint store that keeps every snapshot it was handed, in order.
///
/// `load` returns the most recent save for the task, so it doubles as a
/// tiny in-memory store for resume tests.
#[derive(Default)]
pub struct RecordingStore {
    saves: Mutex<Vec<TaskSnapshot>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn saved_states(&self) -> Vec<GovernorState> {
        self.saves.lock().unwrap().iter().map(|s| s.state).collect()
    }

    pub fn last(&self) -> Option<TaskSnapshot> {
        self.saves.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CheckpointStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn save(&self, snapshot: &TaskSnapshot) -> Result<(), CheckpointError> {
        self.saves.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn load(&self, task_id: &TaskId) -> Result<Option<TaskSnapshot>, CheckpointError> {
        Ok(self
            .saves
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| &s.task_id == task_id)
            .cloned())
    }

    async fn delete(&self, task_id: &TaskId) -> Result<(), CheckpointError> {
        self.saves.lock().unwrap().retain(|s| &s.task_id != task_id);
        Ok(())
    }
}

/// Scripted planner output requesting one action.
pub fn action_json(name: &str, arguments: serde_json::Value) -> String {
    json!({
        "type": "action",
        "name": name,
        "arguments": arguments,
        "rationale": "gather evidence"
    })
    .to_string()
}

/// Scripted planner output answering directly.
pub fn answer_json(content: &str, confidence: f32) -> String {
    json!({
        "type": "answer",
        "content": content,
        "confidence": confidence,
        "rationale": "evidence suffices"
    })
    .to_string()
}

/// Scripted planner output asking a clarifying question.
pub fn clarify_json(question: &str) -> String {
    json!({
        "type": "clarify",
        "question": question,
        "rationale": "ambiguous request"
    })
    .to_string()
}

/// Scripted reflection output.
pub fn reflection_json(outcome: &str, evidence: &str, confidence: f32) -> String {
    json!({
        "outcome": outcome,
        "updated_evidence": evidence,
        "confidence": confidence,
        "rationale": "scripted reflection"
    })
    .to_string()
}

//! Provider trait — the abstraction over the LLM decision call.
//!
//! The loop never asks a model for free-form chat: every call is a decision
//! with a structured-output contract (a plan, a reflection, a refined query).
//! The provider returns raw text; extraction and validation of the embedded
//! JSON happen on the caller side so a sloppy model can only ever degrade a
//! single decision, never crash the loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One decision call to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Instructions and output contract
    pub system_prompt: String,

    /// The situation to decide on
    pub user_prompt: String,

    /// Temperature (decisions want it low)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.2
}

/// Sampling settings shared by every decision call one loop makes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionParams {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

impl DecisionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_params(mut self, params: DecisionParams) -> Self {
        self.temperature = params.temperature;
        self.max_tokens = params.max_tokens;
        self
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The raw outcome of a decision call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Raw model text (JSON extraction happens caller-side)
    pub content: String,

    /// Which model actually responded
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The core Provider trait.
///
/// Implementations: OpenAI-compatible HTTP endpoints, a scripted provider
/// for tests and offline runs.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai-compat").
    fn name(&self) -> &str;

    /// Make one decision call.
    async fn decide(
        &self,
        request: DecisionRequest,
    ) -> std::result::Result<DecisionResponse, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Extract the first JSON object embedded in model output.
///
/// Handles the usual failure modes: markdown code fences, prose before and
/// after the object, nested braces, braces inside string literals. Returns
/// `None` when no balanced object is found.
pub fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_request_defaults_to_low_temperature() {
        let req = DecisionRequest::new("system", "user");
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn params_override_request_defaults() {
        let params = DecisionParams {
            temperature: 0.7,
            max_tokens: Some(512),
        };
        let req = DecisionRequest::new("system", "user").with_params(params);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, Some(512));
    }

    #[test]
    fn extract_plain_object() {
        let out = extract_json_object(r#"{"outcome": "answer"}"#).unwrap();
        assert_eq!(out, r#"{"outcome": "answer"}"#);
    }

    #[test]
    fn extract_from_code_fence_with_prose() {
        let text = "Here is my decision:\n```json\n{\"outcome\": \"continue\", \"confidence\": 0.6}\n```\nLet me know.";
        let out = extract_json_object(text).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["outcome"], "continue");
    }

    #[test]
    fn extract_handles_nested_and_braces_in_strings() {
        let text = r#"{"a": {"b": "with } brace"}, "c": 1} trailing"#;
        let out = extract_json_object(text).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["c"], 1);
        assert_eq!(parsed["a"]["b"], "with } brace");
    }

    #[test]
    fn extract_returns_none_without_object() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{unbalanced").is_none());
    }
}

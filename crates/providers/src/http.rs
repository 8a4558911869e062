//! OpenAI-compatible decision provider.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! endpoint exposing a `/v1/chat/completions` route. Decision calls are
//! always non-streaming: one system message, one user message, one choice
//! back. JSON extraction from the returned text happens on the caller side.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use triagent_config::AppConfig;
use triagent_core::{DecisionRequest, DecisionResponse, Provider, ProviderError, Usage};

/// An OpenAI-compatible LLM provider.
///
/// This covers the vast majority of hosted and self-hosted providers since
/// most expose the same chat-completions shape.
#[derive(Debug)]
pub struct HttpProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HttpProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Build from loaded application config.
    ///
    /// Fails when no API key is available; the scripted provider is the only
    /// keyless option.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured(
                "no API key set; add api_key to config.toml or export TRIAGENT_API_KEY".into(),
            )
        })?;
        Ok(Self::new(
            "openai-compat",
            &config.api_url,
            api_key,
            &config.model,
        ))
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, model)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
        )
    }

    /// The chat-completions request body for one decision call.
    fn request_body(&self, request: &DecisionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt},
            ],
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn decide(
        &self,
        request: DecisionRequest,
    ) -> std::result::Result<DecisionResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(provider = %self.name, model = %self.model, "Sending decision request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ChatResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedOutput("no choices in response".into()))?;

        Ok(DecisionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model,
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- Chat-completions API types (internal) ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openrouter_constructor() {
        let provider = HttpProvider::openrouter("sk-test", "gpt-4o-mini");
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn ollama_constructor() {
        let provider = HttpProvider::ollama(None, "llama3");
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url.contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = HttpProvider::new("test", "https://api.example.com/v1/", "key", "m");
        assert_eq!(provider.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn from_config_requires_an_api_key() {
        let config = AppConfig::default();
        let err = HttpProvider::from_config(&config).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn from_config_uses_configured_endpoint_and_model() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            api_url: "https://router.example/v1".into(),
            model: "decision-model".into(),
            ..AppConfig::default()
        };
        let provider = HttpProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "https://router.example/v1");
        assert_eq!(provider.model, "decision-model");
    }

    #[test]
    fn request_body_shape() {
        let provider = HttpProvider::new("test", "https://api.example.com/v1", "key", "gpt-4o");
        let request = DecisionRequest::new("follow the contract", "decide now").with_max_tokens(256);
        let body = provider.request_body(&request);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "follow the contract");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "decide now");
    }

    #[test]
    fn request_body_omits_unset_max_tokens() {
        let provider = HttpProvider::new("test", "https://api.example.com/v1", "key", "gpt-4o");
        let body = provider.request_body(&DecisionRequest::new("s", "u"));
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parse_completion_response() {
        let data = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "{\"type\":\"answer\"}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 18, "total_tokens": 138}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.model, "gpt-4o-mini");
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"type\":\"answer\"}")
        );
        assert_eq!(parsed.usage.as_ref().unwrap().total_tokens, 138);
    }

    #[test]
    fn parse_response_without_content_or_usage() {
        let data = r#"{"model": "m", "choices": [{"message": {"role": "assistant"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert!(parsed.usage.is_none());
    }
}

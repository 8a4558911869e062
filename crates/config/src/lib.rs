//! Configuration loading, validation, and management for triagent.
//!
//! Loads configuration from `~/.triagent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.triagent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the decision provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for planning and reflection calls
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for decision calls (kept low on purpose)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per decision call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Loop governor settings
    #[serde(default)]
    pub governor: GovernorConfig,

    /// Retrieval-refinement settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Reranker weights
    #[serde(default)]
    pub rerank: RerankConfig,

    /// Response quality gate settings
    #[serde(default)]
    pub quality: QualityConfig,

    /// Checkpoint storage settings
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("governor", &self.governor)
            .field("retrieval", &self.retrieval)
            .field("rerank", &self.rerank)
            .field("quality", &self.quality)
            .field("checkpoint", &self.checkpoint)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Loop governor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Plan cycles allowed per task before forced termination
    #[serde(default = "default_step_budget")]
    pub step_budget: u32,

    /// Clarification requests allowed before escalating
    #[serde(default = "default_max_clarifications")]
    pub max_clarification_attempts: u32,

    /// Confidence at or above which an answer ships directly
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// What to do after repeated failures with nothing to show:
    /// "continue" (normal routing), "clarify", or "answer"
    #[serde(default = "default_pure_failure_policy")]
    pub pure_failure_policy: String,
}

fn default_step_budget() -> u32 {
    6
}
fn default_max_clarifications() -> u32 {
    2
}
fn default_confidence_threshold() -> f32 {
    0.7
}
fn default_pure_failure_policy() -> String {
    "continue".into()
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            step_budget: default_step_budget(),
            max_clarification_attempts: default_max_clarifications(),
            confidence_threshold: default_confidence_threshold(),
            pure_failure_policy: default_pure_failure_policy(),
        }
    }
}

/// Retrieval-refinement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Refinement passes allowed per query
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Adequacy score at or above which refinement stops
    #[serde(default = "default_adequacy_threshold")]
    pub adequacy_threshold: f32,

    /// Documents requested per retrieval pass
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Whether reranking runs between retrieval and adequacy scoring
    #[serde(default = "default_true")]
    pub rerank: bool,

    /// Sub-queries a complex query may decompose into
    #[serde(default = "default_max_sub_queries")]
    pub max_sub_queries: usize,

    /// Complexity score at or above which a query is decomposed
    #[serde(default = "default_complexity_threshold")]
    pub complexity_threshold: f32,
}

fn default_max_iterations() -> u32 {
    3
}
fn default_adequacy_threshold() -> f32 {
    0.75
}
fn default_top_k() -> usize {
    5
}
fn default_max_sub_queries() -> usize {
    4
}
fn default_complexity_threshold() -> f32 {
    0.5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            adequacy_threshold: default_adequacy_threshold(),
            top_k: default_top_k(),
            rerank: true,
            max_sub_queries: default_max_sub_queries(),
            complexity_threshold: default_complexity_threshold(),
        }
    }
}

/// Reranker blend weights. Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    #[serde(default = "default_contextual_weight")]
    pub contextual_weight: f32,

    #[serde(default = "default_freshness_weight")]
    pub freshness_weight: f32,
}

fn default_semantic_weight() -> f32 {
    0.6
}
fn default_contextual_weight() -> f32 {
    0.3
}
fn default_freshness_weight() -> f32 {
    0.1
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            contextual_weight: default_contextual_weight(),
            freshness_weight: default_freshness_weight(),
        }
    }
}

/// Response quality gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Whether the advisory quality gate runs on answers
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overall score below which a report is marked failed
    #[serde(default = "default_min_quality")]
    pub min_quality_score: f32,
}

fn default_min_quality() -> f32 {
    0.7
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_quality_score: default_min_quality(),
        }
    }
}

/// Checkpoint storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Backend: "memory", "file", "sqlite", or "noop"
    #[serde(default = "default_checkpoint_backend")]
    pub backend: String,

    /// Override the storage path (file directory or sqlite database)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_checkpoint_backend() -> String {
    "sqlite".into()
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: default_checkpoint_backend(),
            path: None,
        }
    }
}

/// Gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub allow_public_bind: bool,
}

fn default_port() -> u16 {
    8642
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allow_public_bind: false,
        }
    }
}

const PURE_FAILURE_POLICIES: &[&str] = &["continue", "clarify", "answer"];
const CHECKPOINT_BACKENDS: &[&str] = &["memory", "file", "sqlite", "noop"];

impl AppConfig {
    /// Load configuration from the default path (~/.triagent/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `TRIAGENT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("TRIAGENT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("TRIAGENT_API_URL") {
            config.api_url = url;
        }

        if let Ok(model) = std::env::var("TRIAGENT_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".triagent")
    }

    /// Where checkpoint backends put their data unless overridden.
    pub fn checkpoint_dir() -> PathBuf {
        Self::config_dir().join("checkpoints")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.governor.step_budget == 0 {
            return Err(ConfigError::ValidationError(
                "governor.step_budget must be positive".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.governor.confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "governor.confidence_threshold must be in [0, 1]".into(),
            ));
        }

        if !PURE_FAILURE_POLICIES.contains(&self.governor.pure_failure_policy.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "governor.pure_failure_policy must be one of {PURE_FAILURE_POLICIES:?}"
            )));
        }

        if self.retrieval.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_iterations must be positive".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.retrieval.adequacy_threshold) {
            return Err(ConfigError::ValidationError(
                "retrieval.adequacy_threshold must be in [0, 1]".into(),
            ));
        }

        let weight_sum = self.rerank.semantic_weight
            + self.rerank.contextual_weight
            + self.rerank.freshness_weight;
        if (weight_sum - 1.0).abs() > 1e-3 {
            return Err(ConfigError::ValidationError(format!(
                "rerank weights must sum to 1.0 (got {weight_sum})"
            )));
        }

        if !(0.0..=1.0).contains(&self.quality.min_quality_score) {
            return Err(ConfigError::ValidationError(
                "quality.min_quality_score must be in [0, 1]".into(),
            ));
        }

        if !CHECKPOINT_BACKENDS.contains(&self.checkpoint.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "checkpoint.backend must be one of {CHECKPOINT_BACKENDS:?}"
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            governor: GovernorConfig::default(),
            retrieval: RetrievalConfig::default(),
            rerank: RerankConfig::default(),
            quality: QualityConfig::default(),
            checkpoint: CheckpointConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

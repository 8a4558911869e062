//! Pipeline assembly shared by CLI commands.
//!
//! `run`, `gateway`, and `doctor` all need the same pieces — a provider,
//! the capability registry, and a checkpoint store — each built from loaded
//! configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use triagent_capabilities::default_registry_with;
use triagent_checkpoint::{FileStore, MemoryStore, NoopStore, SqliteStore};
use triagent_config::AppConfig;
use triagent_core::{CapabilityRegistry, CheckpointStore, DecisionParams, Provider, Retriever};
use triagent_governor::{ConfidenceRouter, PureFailurePolicy, TaskRunner};
use triagent_providers::HttpProvider;
use triagent_quality::QualityValidator;
use triagent_retrieval::{KeywordRetriever, RefinementConfig, RerankWeights};

/// The assembled pieces of the triage pipeline.
pub struct Pipeline {
    pub provider: Arc<dyn Provider>,
    pub registry: Arc<CapabilityRegistry>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

impl Pipeline {
    /// Assemble provider, registry, and checkpoint store from config.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let provider: Arc<dyn Provider> = Arc::new(HttpProvider::from_config(config)?);
        let retriever: Arc<dyn Retriever> = Arc::new(KeywordRetriever::demo());

        let refinement = RefinementConfig {
            max_iterations: config.retrieval.max_iterations,
            adequacy_threshold: config.retrieval.adequacy_threshold,
            top_k: config.retrieval.top_k,
            rerank: config.retrieval.rerank,
            max_sub_queries: config.retrieval.max_sub_queries,
            complexity_threshold: config.retrieval.complexity_threshold,
        };
        let weights = RerankWeights {
            semantic: config.rerank.semantic_weight,
            contextual: config.rerank.contextual_weight,
            freshness: config.rerank.freshness_weight,
        };
        let registry = Arc::new(default_registry_with(retriever, refinement, weights));
        let checkpoints = build_checkpoints(config).await?;

        Ok(Self {
            provider,
            registry,
            checkpoints,
        })
    }

    /// A task runner wired with the governor and quality settings.
    pub fn runner(&self, config: &AppConfig) -> TaskRunner {
        // validate() has already vetted the policy string
        let policy = config
            .governor
            .pure_failure_policy
            .parse::<PureFailurePolicy>()
            .unwrap_or_default();

        let runner = TaskRunner::new(
            self.provider.clone(),
            self.registry.clone(),
            self.checkpoints.clone(),
        )
        .with_router(
            ConfidenceRouter::new(config.governor.max_clarification_attempts)
                .with_threshold(config.governor.confidence_threshold),
        )
        .with_pure_failure_policy(policy)
        .with_decision_params(DecisionParams {
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
        });

        if config.quality.enabled {
            runner.with_validator(
                QualityValidator::new().with_min_score(config.quality.min_quality_score),
            )
        } else {
            runner.without_quality_gate()
        }
    }
}

/// Build the checkpoint store named by `checkpoint.backend`.
pub async fn build_checkpoints(config: &AppConfig) -> anyhow::Result<Arc<dyn CheckpointStore>> {
    match config.checkpoint.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "file" => {
            let dir = config
                .checkpoint
                .path
                .clone()
                .map(PathBuf::from)
                .unwrap_or_else(AppConfig::checkpoint_dir);
            Ok(Arc::new(FileStore::new(dir)))
        }
        "sqlite" => {
            let path = match &config.checkpoint.path {
                Some(path) => PathBuf::from(path),
                None => AppConfig::checkpoint_dir().join("tasks.db"),
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let store = SqliteStore::new(&path.to_string_lossy()).await?;
            Ok(Arc::new(store))
        }
        "noop" => Ok(Arc::new(NoopStore)),
        other => anyhow::bail!("unknown checkpoint backend {other:?}"),
    }
}

//! HTTP gateway for triagent.
//!
//! Exposes the triage pipeline over REST: submit a task, read back its
//! checkpointed state, list the registered capabilities, and check service
//! status. Built on axum; every piece of the pipeline is shared behind an
//! `Arc` so one process serves many concurrent tasks.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use triagent_config::GatewayConfig;
use triagent_core::{CapabilityRegistry, CheckpointStore, Provider};
use triagent_governor::TaskRunner;

/// Shared application state for the gateway.
///
/// The provider, registry, and checkpoint store are the same `Arc`s the
/// runner holds; they are kept here as well so the read-only endpoints can
/// answer without going through the runner.
pub struct GatewayState {
    pub runner: TaskRunner,
    pub provider: Arc<dyn Provider>,
    pub registry: Arc<CapabilityRegistry>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub start_time: DateTime<Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(
        runner: TaskRunner,
        provider: Arc<dyn Provider>,
        registry: Arc<CapabilityRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            runner,
            provider,
            registry,
            checkpoints,
            start_time: Utc::now(),
        }
    }
}

/// Build the full router: `/health` at the root plus the v1 API.
///
/// Layers applied: request body size limit (64 KB — task submissions are
/// small), CORS restricted to the local frontend origin, and HTTP trace
/// logging.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(HeaderValue::from_static(
            "http://localhost:8642",
        )))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api::v1_router(state))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and serve until the process exits.
///
/// A non-loopback host is refused unless `allow_public_bind` is set; the
/// pipeline has no authentication layer of its own, so public exposure has
/// to be a deliberate choice.
pub async fn serve(state: SharedState, config: &GatewayConfig) -> std::io::Result<()> {
    let loopback = matches!(config.host.as_str(), "127.0.0.1" | "localhost" | "::1");
    let host = if loopback || config.allow_public_bind {
        config.host.clone()
    } else {
        warn!(
            host = %config.host,
            "refusing public bind; falling back to 127.0.0.1 (set gateway.allow_public_bind)"
        );
        "127.0.0.1".to_string()
    };
    let addr = format!("{host}:{port}", port = config.port);

    let app = build_router(state);

    info!(addr = %addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

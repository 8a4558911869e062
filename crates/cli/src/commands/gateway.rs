//! `triagent gateway` — Start the HTTP API server.

use std::sync::Arc;

use triagent_config::AppConfig;
use triagent_gateway::GatewayState;

use crate::wiring::Pipeline;

pub async fn run(port_override: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let pipeline = Pipeline::from_config(&config).await?;
    let runner = pipeline.runner(&config);
    let state = Arc::new(GatewayState::new(
        runner,
        pipeline.provider.clone(),
        pipeline.registry.clone(),
        pipeline.checkpoints.clone(),
    ));

    println!("🧭 triagent gateway");
    println!("   Listening:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:    {}", pipeline.provider.name());
    println!("   Checkpoints: {}", pipeline.checkpoints.name());

    triagent_gateway::serve(state, &config.gateway).await?;

    Ok(())
}
